//! Errors raised by the presentation path.

use gsync_rhi::{RhiError, vk};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A one-time creation step failed
    #[error("Setup failed: {0}")]
    SetupFailure(String),

    #[error("Device lost")]
    DeviceLost,

    /// The surface was lost or the swapchain went out of date
    #[error("Surface lost ({0:?})")]
    SurfaceLost(vk::Result),

    /// A fence or acquire wait exceeded its bound
    #[error("Wait timed out")]
    WaitTimeout,

    #[error(transparent)]
    Rhi(RhiError),
}

impl EngineError {
    /// Classifies a raw Vulkan result.
    pub fn from_vk(result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_DEVICE_LOST => EngineError::DeviceLost,
            vk::Result::ERROR_SURFACE_LOST_KHR | vk::Result::ERROR_OUT_OF_DATE_KHR => {
                EngineError::SurfaceLost(result)
            }
            vk::Result::TIMEOUT | vk::Result::NOT_READY => EngineError::WaitTimeout,
            other => EngineError::Rhi(RhiError::VulkanError(other)),
        }
    }

    /// Whether the frame loop must stop. No engine error is retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::SetupFailure(_)
            | EngineError::DeviceLost
            | EngineError::SurfaceLost(_)
            | EngineError::WaitTimeout
            | EngineError::Rhi(_) => true,
        }
    }
}

impl From<vk::Result> for EngineError {
    fn from(result: vk::Result) -> Self {
        EngineError::from_vk(result)
    }
}

impl From<RhiError> for EngineError {
    fn from(error: RhiError) -> Self {
        match error.vk_result() {
            Some(result) => EngineError::from_vk(result),
            None => EngineError::Rhi(error),
        }
    }
}

impl From<gsync_core::Error> for EngineError {
    fn from(error: gsync_core::Error) -> Self {
        EngineError::SetupFailure(error.to_string())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
