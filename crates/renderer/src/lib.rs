//! Presentation path of the G-Sync test bench.
//!
//! - [`PresentationEngine`] sequences wait, acquire, record, submit and
//!   present over a ring of frame slots
//! - [`PresentBackend`] is the set of GPU calls it needs
//! - [`VulkanBackend`] implements those calls with `gsync_rhi`

mod engine;
mod error;
mod push_constants;
mod vulkan;

pub use engine::{AcquiredImage, PresentBackend, PresentationEngine, SlotState};
pub use error::{EngineError, EngineResult};
pub use push_constants::BarPushConstants;
pub use vulkan::VulkanBackend;
