//! Frame pacing for the G-Sync test bench.
//!
//! This crate contains everything that decides *when* and *where* a frame is
//! drawn, with no GPU dependency:
//! - [`FrameRateController`], the oscillating target frame rate
//! - [`Animator`], the bar position accumulator
//! - [`SyncModes`], the V-Sync and G-Sync toggles
//! - [`FrameLoop`], the per-frame driver and its collaborator traits

pub mod animator;
mod frame_context;
pub mod frame_loop;
pub mod frame_rate;
mod stats;
pub mod sync_mode;

pub use animator::Animator;
pub use frame_context::FrameContext;
pub use frame_loop::{FrameLoop, FrameObserver, FrameSink, InputCommands, InputSource};
pub use frame_rate::FrameRateController;
pub use stats::{FrameStats, status_line};
pub use sync_mode::{SyncModes, SyncToggle};
