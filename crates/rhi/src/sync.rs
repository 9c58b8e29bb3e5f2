//! Synchronization primitives for Vulkan.
//!
//! - [`Semaphore`]: GPU-side ordering between acquire, submit and present
//! - [`Fence`]: CPU-observable completion of one queue submission
//! - [`FrameSync`]: the set owned by one frame slot
//!
//! Fence waits return the raw [`vk::Result`] so callers can tell a timeout
//! from a lost device.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, trace};

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan binary semaphore wrapper.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates an unsignaled binary semaphore.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };
        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Vulkan fence wrapper.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a fence, optionally already signaled.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { device.handle().create_fence(&create_info, None)? };
        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence signals or `timeout_ns` elapses.
    ///
    /// An expired timeout is reported as `Err(vk::Result::TIMEOUT)`.
    pub fn wait(&self, timeout_ns: u64) -> Result<(), vk::Result> {
        let fences = [self.fence];
        trace!("Waiting on fence {:?}", self.fence);
        unsafe {
            self.device
                .handle()
                .wait_for_fences(&fences, true, timeout_ns)
        }
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// The fence must not be pending on any queue.
    pub fn reset(&self) -> Result<(), vk::Result> {
        let fences = [self.fence];
        unsafe { self.device.handle().reset_fences(&fences) }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects of one frame slot.
///
/// ```text
/// wait(in_flight) -> reset(in_flight)
/// acquire            signals image_available
/// submit             waits image_available, signals in_flight
/// ```
///
/// The render-finished semaphore waited by present belongs to the swapchain
/// image rather than the slot, since a slot can come around again before
/// the presentation engine has consumed it.
pub struct FrameSync {
    image_available: Semaphore,
    in_flight: Fence,
}

impl FrameSync {
    /// The in-flight fence starts signaled so a slot that never submitted
    /// does not block.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;
        debug!("Created frame slot synchronization objects");

        Ok(Self {
            image_available,
            in_flight,
        })
    }

    #[inline]
    pub fn image_available(&self) -> &Semaphore {
        &self.image_available
    }

    #[inline]
    pub fn in_flight(&self) -> &Fence {
        &self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_objects_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
        assert_send_sync::<Fence>();
        assert_send_sync::<FrameSync>();
    }
}
