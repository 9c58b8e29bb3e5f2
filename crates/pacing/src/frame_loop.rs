//! The control loop that ties timing, input, animation and presentation
//! together.
//!
//! Each iteration runs, in order:
//!
//! 1. [`Clock::tick`]
//! 2. [`FrameRateController::compute_next_delay`] at the new clock time
//! 3. [`InputSource::poll`], which may stop the loop or change bounds and modes
//! 4. [`Animator::advance`] by the clock delta
//! 5. [`FrameSink::render_and_present`] with the new position
//! 6. [`Sleeper::sleep_secs`] for the computed delay
//!
//! The frame on which quit is requested is still rendered. The loop checks
//! its running flag once per iteration.

use gsync_core::{Clock, MonotonicSource, Sleeper, TimeSource};
use tracing::{debug, info};

use crate::animator::Animator;
use crate::frame_context::FrameContext;
use crate::frame_rate::FrameRateController;
use crate::sync_mode::SyncModes;

/// Result of one input poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputCommands {
    pub quit: bool,
    /// Signed change to the minimum rate bound.
    pub adjust_min_by: i32,
    /// Signed change to the maximum rate bound.
    pub adjust_max_by: i32,
    pub toggle_vsync: bool,
    pub toggle_gsync: bool,
}

impl InputCommands {
    /// Merges two polls; adjustments add up and toggles cancel in pairs.
    pub fn merge(self, other: Self) -> Self {
        Self {
            quit: self.quit || other.quit,
            adjust_min_by: self.adjust_min_by.saturating_add(other.adjust_min_by),
            adjust_max_by: self.adjust_max_by.saturating_add(other.adjust_max_by),
            toggle_vsync: self.toggle_vsync ^ other.toggle_vsync,
            toggle_gsync: self.toggle_gsync ^ other.toggle_gsync,
        }
    }
}

/// Source of user commands, polled once per frame.
pub trait InputSource {
    fn poll(&mut self) -> InputCommands;
}

/// The render path as seen from the loop.
pub trait FrameSink {
    type Error;

    /// Renders and presents one frame with the bar at `position`.
    fn render_and_present(&mut self, position: f32) -> Result<(), Self::Error>;

    /// Switches presentation between synchronized and unsynchronized.
    fn apply_vsync(&mut self, enabled: bool) -> Result<(), Self::Error>;
}

/// Called after every completed frame.
pub trait FrameObserver {
    fn on_frame(
        &mut self,
        context: &FrameContext,
        controller: &FrameRateController,
        modes: &SyncModes,
    );
}

impl<F> FrameObserver for F
where
    F: FnMut(&FrameContext, &FrameRateController, &SyncModes),
{
    fn on_frame(
        &mut self,
        context: &FrameContext,
        controller: &FrameRateController,
        modes: &SyncModes,
    ) {
        self(context, controller, modes)
    }
}

/// Owns all pacing state and drives the per-frame sequence.
#[derive(Debug)]
pub struct FrameLoop<S = MonotonicSource> {
    clock: Clock<S>,
    controller: FrameRateController,
    animator: Animator,
    modes: SyncModes,
    animation_duration_sec: f64,
    running: bool,
    frames: u64,
}

impl<S: TimeSource> FrameLoop<S> {
    pub fn new(
        clock: Clock<S>,
        controller: FrameRateController,
        modes: SyncModes,
        animation_duration_sec: f64,
    ) -> Self {
        Self {
            clock,
            controller,
            animator: Animator::new(),
            modes,
            animation_duration_sec,
            running: true,
            frames: 0,
        }
    }

    /// Runs a single iteration and returns its context.
    pub fn run_frame<I, K, Z>(
        &mut self,
        input: &mut I,
        sink: &mut K,
        sleeper: &mut Z,
    ) -> Result<FrameContext, K::Error>
    where
        I: InputSource + ?Sized,
        K: FrameSink + ?Sized,
        Z: Sleeper + ?Sized,
    {
        self.clock.tick();
        self.controller.compute_next_delay(self.clock.current_time_sec());

        let mut context = FrameContext {
            frame_delay_sec: self.controller.next_frame_delay_sec(),
            animation_duration_sec: self.animation_duration_sec,
            position: self.animator.position(),
            time_sec: self.clock.current_time_sec(),
            delta_sec: self.clock.delta_sec(),
        };

        let commands = input.poll();
        self.apply_commands(commands, sink)?;

        context.position = self
            .animator
            .advance(self.clock.delta_sec(), self.animation_duration_sec);

        sink.render_and_present(context.position)?;
        self.frames += 1;

        sleeper.sleep_secs(context.frame_delay_sec);
        Ok(context)
    }

    /// Runs until input requests quit or the sink fails.
    ///
    /// Returns the number of frames produced.
    pub fn run<I, K, Z, O>(
        &mut self,
        input: &mut I,
        sink: &mut K,
        sleeper: &mut Z,
        observer: &mut O,
    ) -> Result<u64, K::Error>
    where
        I: InputSource + ?Sized,
        K: FrameSink + ?Sized,
        Z: Sleeper + ?Sized,
        O: FrameObserver + ?Sized,
    {
        info!("Frame loop started");
        while self.running {
            let context = self.run_frame(input, sink, sleeper)?;
            observer.on_frame(&context, &self.controller, &self.modes);
        }
        info!("Frame loop finished after {} frames", self.frames);
        Ok(self.frames)
    }

    fn apply_commands<K>(&mut self, commands: InputCommands, sink: &mut K) -> Result<(), K::Error>
    where
        K: FrameSink + ?Sized,
    {
        if commands.quit {
            info!("Quit requested");
            self.running = false;
        }

        if commands.adjust_min_by != 0 {
            self.controller.adjust_min(commands.adjust_min_by);
            debug!("Min frame rate now {}", self.controller.min());
        }
        if commands.adjust_max_by != 0 {
            self.controller.adjust_max(commands.adjust_max_by);
            debug!("Max frame rate now {}", self.controller.max());
        }

        if commands.toggle_vsync && self.modes.vsync.toggle() {
            info!("V-Sync {}", self.modes.vsync);
            sink.apply_vsync(self.modes.vsync.is_enabled())?;
        }
        if commands.toggle_gsync {
            if self.modes.gsync.toggle() {
                info!("G-Sync {}", self.modes.gsync);
            } else {
                debug!("G-Sync toggle ignored, not available");
            }
        }

        Ok(())
    }

    /// Stops the loop after the current iteration.
    pub fn stop(&mut self) {
        self.running = false;
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn controller(&self) -> &FrameRateController {
        &self.controller
    }

    /// Mutable access for collaborators other than the per-frame input poll.
    #[inline]
    pub fn controller_mut(&mut self) -> &mut FrameRateController {
        &mut self.controller
    }

    #[inline]
    pub fn modes(&self) -> &SyncModes {
        &self.modes
    }

    #[inline]
    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    #[inline]
    pub fn clock(&self) -> &Clock<S> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_adjustments() {
        let a = InputCommands {
            adjust_max_by: 10,
            toggle_vsync: true,
            ..Default::default()
        };
        let b = InputCommands {
            adjust_max_by: -20,
            toggle_vsync: true,
            quit: true,
            ..Default::default()
        };
        let merged = a.merge(b);
        assert_eq!(merged.adjust_max_by, -10);
        assert!(!merged.toggle_vsync);
        assert!(merged.quit);
    }

    #[test]
    fn test_closure_is_observer() {
        let mut count = 0;
        let mut observer = |_: &FrameContext, _: &FrameRateController, _: &SyncModes| count += 1;
        let controller = FrameRateController::new(60.0);
        let modes = SyncModes::new(true, false, false);
        observer.on_frame(&FrameContext::default(), &controller, &modes);
        observer.on_frame(&FrameContext::default(), &controller, &modes);
        assert_eq!(count, 2);
    }
}
