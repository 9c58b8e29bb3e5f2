//! Oscillating target frame rate.
//!
//! The [`FrameRateController`] produces a simulated producer frame rate that
//! swings sinusoidally between its minimum and maximum bounds at one radian
//! per second of wall-clock time:
//!
//! ```text
//! effective_min = max(floor, min)
//! rate(t)       = (effective_min + max) / 2 + (max - effective_min) / 2 * sin(t)
//! delay(t)      = 1 / rate(t)
//! ```
//!
//! The phase depends only on `t`, never on how many frames were produced.
//!
//! # Example
//!
//! ```
//! use gsync_pacing::FrameRateController;
//!
//! let mut controller = FrameRateController::new(60.0);
//! controller.compute_next_delay(0.0);
//! assert_eq!(controller.current_simulated_rate(), 45.0);
//! ```

/// Lowest rate any bound may reach.
pub const FRAME_RATE_FLOOR: f64 = 10.0;

/// Initial minimum bound.
pub const DEFAULT_MIN_FRAME_RATE: f64 = 30.0;

/// Lower limit for the initial maximum bound, regardless of the display.
pub const BASELINE_MAX_FRAME_RATE: f64 = 60.0;

/// Stateful frame rate oscillator with user-adjustable bounds.
///
/// `floor <= min <= max` holds after every operation, which keeps the
/// simulated rate strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRateController {
    floor: f64,
    min: f64,
    max: f64,
    current_simulated_rate: f64,
    next_frame_delay_sec: f64,
}

impl FrameRateController {
    /// Creates a controller for a display refreshing at `display_refresh_hint` Hz.
    ///
    /// The maximum starts at the hint when it exceeds 60 Hz. Unusable hints
    /// (non-finite or non-positive) are ignored.
    pub fn new(display_refresh_hint: f64) -> Self {
        let hint = if display_refresh_hint.is_finite() {
            display_refresh_hint
        } else {
            0.0
        };
        let max = BASELINE_MAX_FRAME_RATE.max(hint);
        let mean = (DEFAULT_MIN_FRAME_RATE + max) / 2.0;

        Self {
            floor: FRAME_RATE_FLOOR,
            min: DEFAULT_MIN_FRAME_RATE,
            max,
            current_simulated_rate: mean,
            next_frame_delay_sec: 1.0 / mean,
        }
    }

    /// Raises the minimum by `by` frames per second, up to the maximum.
    pub fn raise_min(&mut self, by: u32) {
        self.min = (self.min + f64::from(by)).min(self.max);
    }

    /// Lowers the minimum by `by` frames per second, down to the floor.
    pub fn lower_min(&mut self, by: u32) {
        self.min = (self.min - f64::from(by)).max(self.floor);
    }

    /// Raises the maximum by `by` frames per second.
    pub fn raise_max(&mut self, by: u32) {
        self.max += f64::from(by);
    }

    /// Lowers the maximum by `by` frames per second, down to the minimum.
    pub fn lower_max(&mut self, by: u32) {
        self.max = (self.max - f64::from(by)).max(self.min);
    }

    /// Moves the minimum by a signed amount.
    pub fn adjust_min(&mut self, by: i32) {
        if by >= 0 {
            self.raise_min(by.unsigned_abs());
        } else {
            self.lower_min(by.unsigned_abs());
        }
    }

    /// Moves the maximum by a signed amount.
    pub fn adjust_max(&mut self, by: i32) {
        if by >= 0 {
            self.raise_max(by.unsigned_abs());
        } else {
            self.lower_max(by.unsigned_abs());
        }
    }

    /// Updates the simulated rate and frame delay for absolute time `current_time_sec`.
    pub fn compute_next_delay(&mut self, current_time_sec: f64) {
        let effective_min = self.floor.max(self.min);
        let range = self.max - effective_min;
        let mean = (effective_min + self.max) / 2.0;
        let amplitude = range / 2.0;

        self.current_simulated_rate = mean + amplitude * current_time_sec.sin();
        self.next_frame_delay_sec = 1.0 / self.current_simulated_rate;
    }

    #[inline]
    pub fn floor(&self) -> f64 {
        self.floor
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Target frames per second from the last [`compute_next_delay`](Self::compute_next_delay).
    #[inline]
    pub fn current_simulated_rate(&self) -> f64 {
        self.current_simulated_rate
    }

    /// Seconds to wait before the next frame, `1 / current_simulated_rate`.
    #[inline]
    pub fn next_frame_delay_sec(&self) -> f64 {
        self.next_frame_delay_sec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn assert_ordered(c: &FrameRateController) {
        assert!(c.floor() <= c.min(), "floor {} > min {}", c.floor(), c.min());
        assert!(c.min() <= c.max(), "min {} > max {}", c.min(), c.max());
    }

    #[test]
    fn test_initial_bounds_for_60hz() {
        let c = FrameRateController::new(60.0);
        assert_eq!(c.floor(), 10.0);
        assert_eq!(c.min(), 30.0);
        assert_eq!(c.max(), 60.0);
    }

    #[test]
    fn test_initial_max_follows_fast_display() {
        assert_eq!(FrameRateController::new(144.0).max(), 144.0);
        assert_eq!(FrameRateController::new(50.0).max(), 60.0);
        assert_eq!(FrameRateController::new(f64::NAN).max(), 60.0);
        assert_eq!(FrameRateController::new(-5.0).max(), 60.0);
    }

    #[test]
    fn test_rate_at_time_zero_is_mean() {
        let mut c = FrameRateController::new(60.0);
        c.compute_next_delay(0.0);
        assert_eq!(c.current_simulated_rate(), 45.0);
        assert!((c.next_frame_delay_sec() - 1.0 / 45.0).abs() < EPS);
        assert!((c.next_frame_delay_sec() - 0.02222).abs() < 1e-5);
    }

    #[test]
    fn test_rate_extremes_follow_sine_peaks() {
        let mut c = FrameRateController::new(60.0);
        c.compute_next_delay(FRAC_PI_2);
        assert!((c.current_simulated_rate() - 60.0).abs() < EPS);
        c.compute_next_delay(3.0 * FRAC_PI_2);
        assert!((c.current_simulated_rate() - 30.0).abs() < EPS);
    }

    #[test]
    fn test_rate_depends_only_on_time() {
        let mut a = FrameRateController::new(60.0);
        let mut b = FrameRateController::new(60.0);
        for i in 0..50 {
            a.compute_next_delay(f64::from(i) * 0.1);
        }
        a.compute_next_delay(7.3);
        b.compute_next_delay(7.3);
        assert_eq!(a.current_simulated_rate(), b.current_simulated_rate());
    }

    #[test]
    fn test_raise_max_five_times() {
        let mut c = FrameRateController::new(60.0);
        for _ in 0..5 {
            c.raise_max(10);
        }
        assert_eq!(c.max(), 110.0);
        assert_eq!(c.min(), 30.0);
    }

    #[test]
    fn test_lower_min_clamps_to_floor() {
        let mut c = FrameRateController::new(60.0);
        c.lower_min(100);
        assert_eq!(c.min(), 10.0);
        assert_ordered(&c);
    }

    #[test]
    fn test_raise_min_clamps_to_max() {
        let mut c = FrameRateController::new(60.0);
        c.raise_min(1000);
        assert_eq!(c.min(), 60.0);
        assert_ordered(&c);
    }

    #[test]
    fn test_lower_max_clamps_to_min() {
        let mut c = FrameRateController::new(60.0);
        c.lower_max(1000);
        assert_eq!(c.max(), 30.0);
        assert_ordered(&c);

        c.compute_next_delay(1.0);
        assert_eq!(c.current_simulated_rate(), 30.0);
    }

    #[test]
    fn test_adjust_dispatches_on_sign() {
        let mut c = FrameRateController::new(60.0);
        c.adjust_max(10);
        assert_eq!(c.max(), 70.0);
        c.adjust_max(-20);
        assert_eq!(c.max(), 50.0);
        c.adjust_min(10);
        assert_eq!(c.min(), 40.0);
        c.adjust_min(-10);
        assert_eq!(c.min(), 30.0);
        c.adjust_min(i32::MIN);
        assert_eq!(c.min(), 10.0);
    }

    #[test]
    fn test_initial_delay_is_consistent() {
        let c = FrameRateController::new(60.0);
        assert_eq!(c.current_simulated_rate(), 45.0);
        assert!((c.next_frame_delay_sec() * c.current_simulated_rate() - 1.0).abs() < EPS);
    }
}
