//! Measured frame rate and the status line.

use crate::frame_rate::FrameRateController;
use crate::sync_mode::SyncModes;

/// Counts frames over a fixed wall-clock window.
#[derive(Debug, Clone)]
pub struct FrameStats {
    interval_sec: f64,
    window_sec: f64,
    window_frames: u32,
    measured_rate: Option<f64>,
}

impl FrameStats {
    pub fn new(interval_sec: f64) -> Self {
        Self {
            interval_sec,
            window_sec: 0.0,
            window_frames: 0,
            measured_rate: None,
        }
    }

    /// Records one frame that took `delta_sec`.
    ///
    /// Returns the measured rate each time the window fills up.
    pub fn record(&mut self, delta_sec: f64) -> Option<f64> {
        self.window_sec += delta_sec;
        self.window_frames += 1;

        if self.window_sec < self.interval_sec {
            return None;
        }

        let rate = f64::from(self.window_frames) / self.window_sec;
        self.window_sec = 0.0;
        self.window_frames = 0;
        self.measured_rate = Some(rate);
        Some(rate)
    }

    /// Rate from the last completed window.
    #[inline]
    pub fn measured_rate(&self) -> Option<f64> {
        self.measured_rate
    }
}

/// One-line summary of the pacing state, used for logs and the window title.
pub fn status_line(
    controller: &FrameRateController,
    modes: &SyncModes,
    measured_rate: Option<f64>,
) -> String {
    let measured = match measured_rate {
        Some(rate) => format!("{rate:.1}"),
        None => "-".to_string(),
    };
    format!(
        "{modes} | min {:.0} | max {:.0} | target {:.1} fps | measured {measured} fps",
        controller.min(),
        controller.max(),
        controller.current_simulated_rate(),
    )
}
