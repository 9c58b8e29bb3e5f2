//! Monotonic frame clock.
//!
//! [`Clock`] samples a [`TimeSource`] once per frame and keeps the current
//! time, the previous time and the delta between them, all in seconds.

use std::time::{Duration, Instant};

/// A monotonic source of time in seconds.
///
/// Any `FnMut() -> f64` closure is a time source, which keeps tests free of
/// real sleeping.
pub trait TimeSource {
    /// Returns the current time in seconds. Successive calls never decrease.
    fn now_secs(&mut self) -> f64;
}

impl<F> TimeSource for F
where
    F: FnMut() -> f64,
{
    fn now_secs(&mut self) -> f64 {
        self()
    }
}

/// Seconds elapsed since the source was created, backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicSource {
    origin: Instant,
}

impl MonotonicSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicSource {
    fn now_secs(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Per-frame time sampler.
///
/// `delta_sec` is always `current_time_sec - last_time_sec`. The first tick
/// after creation or [`Clock::reset`] therefore reports the whole time since
/// the source origin as its delta.
#[derive(Debug)]
pub struct Clock<S = MonotonicSource> {
    source: S,
    current_time_sec: f64,
    last_time_sec: f64,
    delta_sec: f64,
}

impl Clock<MonotonicSource> {
    /// Creates a clock over a fresh [`MonotonicSource`].
    pub fn monotonic() -> Self {
        Self::new(MonotonicSource::new())
    }
}

impl<S: TimeSource> Clock<S> {
    /// Creates a clock with all fields zeroed.
    pub fn new(source: S) -> Self {
        Self {
            source,
            current_time_sec: 0.0,
            last_time_sec: 0.0,
            delta_sec: 0.0,
        }
    }

    /// Zeroes the current time, the previous time and the delta.
    pub fn reset(&mut self) {
        self.current_time_sec = 0.0;
        self.last_time_sec = 0.0;
        self.delta_sec = 0.0;
    }

    /// Takes a new sample from the time source.
    pub fn tick(&mut self) {
        self.last_time_sec = self.current_time_sec;
        self.current_time_sec = self.source.now_secs();
        self.delta_sec = self.current_time_sec - self.last_time_sec;
    }

    #[inline]
    pub fn current_time_sec(&self) -> f64 {
        self.current_time_sec
    }

    #[inline]
    pub fn last_time_sec(&self) -> f64 {
        self.last_time_sec
    }

    #[inline]
    pub fn delta_sec(&self) -> f64 {
        self.delta_sec
    }
}

/// Blocks the calling thread for a frame delay.
pub trait Sleeper {
    fn sleep_secs(&mut self, secs: f64);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
///
/// Non-positive and non-finite durations return immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep_secs(&mut self, secs: f64) {
        if let Ok(duration) = Duration::try_from_secs_f64(secs)
            && !duration.is_zero()
        {
            std::thread::sleep(duration);
        }
    }
}
