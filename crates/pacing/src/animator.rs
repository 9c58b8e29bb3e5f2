//! Horizontal bar animation.

/// Width of the normalized position range. Positions live in `[0, CYCLE_SPAN)`.
pub const CYCLE_SPAN: f32 = 2.0;

/// Accumulates the bar position from per-frame deltas.
///
/// The bar moves at a constant `CYCLE_SPAN / cycle_duration_sec` units per
/// second of simulated time, whatever the delivery rate. Once the position
/// reaches [`CYCLE_SPAN`] it restarts at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Animator {
    position: f32,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `delta_sec` and returns the new position.
    pub fn advance(&mut self, delta_sec: f64, cycle_duration_sec: f64) -> f32 {
        let speed = f64::from(CYCLE_SPAN) / cycle_duration_sec;
        self.position += (speed * delta_sec) as f32;

        if self.position >= CYCLE_SPAN {
            self.position = 0.0;
        }

        self.position
    }

    #[inline]
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Moves the bar back to the left edge.
    pub fn reset(&mut self) {
        self.position = 0.0;
    }
}
