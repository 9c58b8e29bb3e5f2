//! Frame slot discipline on top of a [`PresentBackend`].
//!
//! Each frame slot owns one command buffer, one image-available semaphore
//! and one fence. Slots are used round-robin and move through
//!
//! ```text
//! Idle -> Recording -> Submitted -> Presented -> (fence waited) -> Idle
//! ```
//!
//! A slot's fence is waited only while the slot is in flight, so the
//! signaled fences a backend starts with are never waited. Before recording
//! into an acquired image, any other in-flight slot still referencing that
//! image is waited as well.

use std::time::Duration;

use gsync_core::config::PresentationConfig;
use gsync_core::{Sleeper, ThreadSleeper};
use gsync_pacing::FrameSink;
use tracing::{debug, error, info, trace, warn};

use crate::error::{EngineError, EngineResult};

/// An image handed out by the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    pub index: u32,
    pub suboptimal: bool,
}

/// The GPU calls the engine sequences.
///
/// `slot` is always below [`ring_size`](PresentBackend::ring_size). The
/// engine guarantees that `record_frame` and `submit_frame` for a slot only
/// happen after that slot's fence was waited (or never submitted) and reset.
pub trait PresentBackend {
    /// Number of frame slots, equal to the presentable image count.
    fn ring_size(&self) -> usize;

    fn wait_slot_fence(&mut self, slot: usize, timeout_ns: u64) -> EngineResult<()>;

    fn reset_slot_fence(&mut self, slot: usize) -> EngineResult<()>;

    /// Acquires the next image, signaling the slot's image-available
    /// semaphore when it becomes writable.
    fn acquire_image(&mut self, slot: usize) -> EngineResult<AcquiredImage>;

    fn record_frame(&mut self, slot: usize, image: u32, position: f32) -> EngineResult<()>;

    /// Submits the slot's commands, signaling its fence on completion.
    fn submit_frame(&mut self, slot: usize, image: u32) -> EngineResult<()>;

    /// Presents `image` once its rendering completes. Returns `true` when
    /// the surface reports suboptimal.
    fn present_image(&mut self, slot: usize, image: u32) -> EngineResult<bool>;

    fn wait_idle(&mut self) -> EngineResult<()>;

    /// Recreates the image ring with a present mode for `vsync`.
    ///
    /// Called only when nothing is in flight.
    fn rebuild(&mut self, vsync: bool) -> EngineResult<()>;
}

/// Lifecycle of one frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Idle,
    Recording {
        image: u32,
    },
    Submitted {
        image: u32,
    },
    Presented {
        image: u32,
    },
}

impl SlotState {
    /// Whether GPU work for this slot may still be outstanding.
    #[inline]
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            SlotState::Submitted { .. } | SlotState::Presented { .. }
        )
    }

    /// The image this slot last worked on, if it is not idle.
    pub fn image(self) -> Option<u32> {
        match self {
            SlotState::Idle => None,
            SlotState::Recording { image }
            | SlotState::Submitted { image }
            | SlotState::Presented { image } => Some(image),
        }
    }
}

/// Owns a backend and drives one frame per
/// [`render_and_present`](Self::render_and_present) call.
pub struct PresentationEngine<B: PresentBackend, Z: Sleeper = ThreadSleeper> {
    backend: Option<B>,
    slots: Vec<SlotState>,
    current_slot: usize,
    fence_timeout_ns: u64,
    throttle: Option<Duration>,
    sleeper: Z,
    frames_rendered: u64,
    suboptimal_reported: bool,
}

impl<B: PresentBackend> PresentationEngine<B> {
    pub fn new(backend: B, config: &PresentationConfig) -> Self {
        Self::with_sleeper(backend, config, ThreadSleeper)
    }
}

impl<B: PresentBackend, Z: Sleeper> PresentationEngine<B, Z> {
    /// Creates an engine whose optional present throttle sleeps on `sleeper`.
    pub fn with_sleeper(backend: B, config: &PresentationConfig, sleeper: Z) -> Self {
        let ring_size = backend.ring_size();
        let throttle = config.present_throttle_ms.map(Duration::from_millis);
        info!(
            "Presentation engine ready: {} frame slots, fence timeout {} ns, throttle {:?}",
            ring_size, config.fence_timeout_ns, throttle
        );

        Self {
            backend: Some(backend),
            slots: vec![SlotState::Idle; ring_size],
            current_slot: 0,
            fence_timeout_ns: config.fence_timeout_ns,
            throttle,
            sleeper,
            frames_rendered: 0,
            suboptimal_reported: false,
        }
    }

    /// Renders and presents one frame with the bar at `position`.
    ///
    /// # Errors
    ///
    /// Every error is fatal. A fence wait that exceeds the configured
    /// timeout becomes [`EngineError::WaitTimeout`].
    pub fn render_and_present(&mut self, position: f32) -> EngineResult<()> {
        let timeout_ns = self.fence_timeout_ns;
        let slot = self.current_slot;
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| EngineError::SetupFailure("engine already shut down".to_string()))?;

        if self.slots[slot].is_in_flight() {
            trace!("Waiting for slot {} ({:?})", slot, self.slots[slot]);
            backend.wait_slot_fence(slot, timeout_ns)?;
            self.slots[slot] = SlotState::Idle;
        }
        backend.reset_slot_fence(slot)?;

        let acquired = backend.acquire_image(slot)?;
        let image = acquired.index;

        let owner = self
            .slots
            .iter()
            .enumerate()
            .find(|&(i, state)| i != slot && state.is_in_flight() && state.image() == Some(image))
            .map(|(i, _)| i);
        if let Some(owner) = owner {
            trace!("Image {} still owned by slot {}, waiting", image, owner);
            backend.wait_slot_fence(owner, timeout_ns)?;
            self.slots[owner] = SlotState::Idle;
        }

        self.slots[slot] = SlotState::Recording { image };
        backend.record_frame(slot, image, position)?;

        backend.submit_frame(slot, image)?;
        self.slots[slot] = SlotState::Submitted { image };

        let suboptimal = backend.present_image(slot, image)?;
        self.slots[slot] = SlotState::Presented { image };

        if (acquired.suboptimal || suboptimal) && !self.suboptimal_reported {
            warn!("Swapchain is suboptimal for the surface, continuing without recreation");
            self.suboptimal_reported = true;
        }

        self.frames_rendered += 1;
        self.current_slot = (slot + 1) % self.slots.len();
        trace!(
            "Frame {} presented: slot {}, image {}, x {:.3}",
            self.frames_rendered, slot, image, position
        );

        if let Some(throttle) = self.throttle {
            self.sleeper.sleep_secs(throttle.as_secs_f64());
        }

        Ok(())
    }

    /// Waits every in-flight slot and marks all slots idle.
    pub fn drain(&mut self) -> EngineResult<()> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };

        for (slot, state) in self.slots.iter_mut().enumerate() {
            if state.is_in_flight() {
                debug!("Draining slot {} ({:?})", slot, state);
                backend.wait_slot_fence(slot, self.fence_timeout_ns)?;
            }
            *state = SlotState::Idle;
        }
        Ok(())
    }

    /// Rebuilds the image ring with a present mode matching `enabled`.
    pub fn set_vsync(&mut self, enabled: bool) -> EngineResult<()> {
        self.drain()?;
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| EngineError::SetupFailure("engine already shut down".to_string()))?;

        backend.wait_idle()?;
        backend.rebuild(enabled)?;

        let ring_size = backend.ring_size();
        self.slots = vec![SlotState::Idle; ring_size];
        self.current_slot = 0;
        info!("Image ring rebuilt: vsync {}, {} frame slots", enabled, ring_size);
        Ok(())
    }

    /// Drains all slots, then releases the backend.
    ///
    /// The backend is released even when draining fails.
    pub fn shutdown(mut self) -> EngineResult<()> {
        info!("Shutting down after {} frames", self.frames_rendered);
        let result = self.drain();
        drop(self.backend.take());
        result
    }

    #[inline]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    #[inline]
    pub fn ring_size(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        self.slots.get(slot).copied()
    }

    #[inline]
    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }
}

impl<B: PresentBackend, Z: Sleeper> Drop for PresentationEngine<B, Z> {
    fn drop(&mut self) {
        if self.backend.is_some()
            && let Err(e) = self.drain()
        {
            error!("Failed to drain frame slots during drop: {}", e);
        }
    }
}

impl<B: PresentBackend, Z: Sleeper> FrameSink for PresentationEngine<B, Z> {
    type Error = EngineError;

    fn render_and_present(&mut self, position: f32) -> EngineResult<()> {
        PresentationEngine::render_and_present(self, position)
    }

    fn apply_vsync(&mut self, enabled: bool) -> EngineResult<()> {
        self.set_vsync(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        ring: usize,
        next_image: u32,
        waits: Vec<usize>,
        presents: Vec<u32>,
    }

    impl PresentBackend for CountingBackend {
        fn ring_size(&self) -> usize {
            self.ring
        }

        fn wait_slot_fence(&mut self, slot: usize, _timeout_ns: u64) -> EngineResult<()> {
            self.waits.push(slot);
            Ok(())
        }

        fn reset_slot_fence(&mut self, _slot: usize) -> EngineResult<()> {
            Ok(())
        }

        fn acquire_image(&mut self, _slot: usize) -> EngineResult<AcquiredImage> {
            let index = self.next_image;
            self.next_image = (self.next_image + 1) % self.ring as u32;
            Ok(AcquiredImage {
                index,
                suboptimal: false,
            })
        }

        fn record_frame(&mut self, _slot: usize, _image: u32, _position: f32) -> EngineResult<()> {
            Ok(())
        }

        fn submit_frame(&mut self, _slot: usize, _image: u32) -> EngineResult<()> {
            Ok(())
        }

        fn present_image(&mut self, _slot: usize, image: u32) -> EngineResult<bool> {
            self.presents.push(image);
            Ok(false)
        }

        fn wait_idle(&mut self) -> EngineResult<()> {
            Ok(())
        }

        fn rebuild(&mut self, _vsync: bool) -> EngineResult<()> {
            Ok(())
        }
    }

    fn engine(ring: usize) -> PresentationEngine<CountingBackend> {
        let backend = CountingBackend {
            ring,
            ..Default::default()
        };
        PresentationEngine::new(backend, &PresentationConfig::default())
    }

    #[test]
    fn test_slot_state_helpers() {
        assert!(!SlotState::Idle.is_in_flight());
        assert!(!SlotState::Recording { image: 0 }.is_in_flight());
        assert!(SlotState::Submitted { image: 1 }.is_in_flight());
        assert!(SlotState::Presented { image: 2 }.is_in_flight());
        assert_eq!(SlotState::Idle.image(), None);
        assert_eq!(SlotState::Presented { image: 2 }.image(), Some(2));
    }

    #[test]
    fn test_first_pass_waits_nothing() {
        let mut engine = engine(3);
        for _ in 0..3 {
            engine.render_and_present(0.0).unwrap();
        }
        let backend = engine.backend().unwrap();
        assert!(backend.waits.is_empty());
        assert_eq!(backend.presents, vec![0, 1, 2]);
        assert_eq!(engine.slot_state(2), Some(SlotState::Presented { image: 2 }));
    }

    #[test]
    fn test_second_pass_waits_each_slot() {
        let mut engine = engine(2);
        for _ in 0..4 {
            engine.render_and_present(0.5).unwrap();
        }
        assert_eq!(engine.backend().unwrap().waits, vec![0, 1]);
        assert_eq!(engine.frames_rendered(), 4);
    }

    #[test]
    fn test_drain_marks_slots_idle() {
        let mut engine = engine(2);
        engine.render_and_present(0.0).unwrap();
        engine.drain().unwrap();
        assert_eq!(engine.slot_state(0), Some(SlotState::Idle));
        assert_eq!(engine.backend().unwrap().waits, vec![0]);

        engine.drain().unwrap();
        assert_eq!(engine.backend().unwrap().waits, vec![0]);
    }

    #[test]
    fn test_render_after_shutdown_state_fails() {
        let mut engine = engine(2);
        drop(engine.backend.take());
        assert!(matches!(
            engine.render_and_present(0.0),
            Err(EngineError::SetupFailure(_))
        ));
    }
}
