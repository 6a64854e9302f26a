//! Synchronization primitives.
//!
//! - [`Semaphore`]: GPU-to-GPU ordering between acquire, submit and present
//! - [`Fence`]: lets the host wait for a submission to retire
//! - [`FrameSync`]: the per-frame pair used by the presentation chain
//!
//! Each frame in flight waits on its own fence before its resources are
//! reused:
//!
//! ```text
//! 1. wait in_flight_fence
//! 2. acquire image (signals image_available)
//! 3. wait on the fence of whichever frame last used that image
//! 4. reset in_flight_fence, submit (waits image_available, signals
//!    render_finished[image] and in_flight_fence)
//! 5. present (waits render_finished[image])
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Maximum number of frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Vulkan semaphore wrapper.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates an unsignaled semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
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
    /// Creates a fence, optionally already signaled so the first wait
    /// returns immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
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

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    ///
    /// # Errors
    ///
    /// Returns `vk::Result::TIMEOUT` on timeout, or the device error.
    pub fn wait(&self, timeout: u64) -> RhiResult<()> {
        wait_for(&self.device, self.fence, timeout)
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe { self.device.handle().reset_fences(&[self.fence])? };
        Ok(())
    }

    /// Non-blocking status query.
    pub fn is_signaled(&self) -> bool {
        let result = unsafe { self.device.handle().get_fence_status(self.fence) };
        matches!(result, Ok(true))
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}

/// Waits on a raw fence handle, as tracked in per-image bookkeeping.
///
/// # Errors
///
/// Returns `vk::Result::TIMEOUT` on timeout, or the device error.
pub fn wait_for(device: &Device, fence: vk::Fence, timeout: u64) -> RhiResult<()> {
    unsafe { device.handle().wait_for_fences(&[fence], true, timeout)? };
    Ok(())
}

/// Per-frame synchronization objects.
pub struct FrameSync {
    image_available: Semaphore,
    in_flight: Fence,
}

impl FrameSync {
    /// Creates the pair; the fence starts signaled.
    ///
    /// # Errors
    ///
    /// Returns an error if any object cannot be created.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;
        debug!("Created frame synchronization primitives");
        Ok(Self {
            image_available,
            in_flight,
        })
    }

    /// Signaled by image acquisition.
    #[inline]
    pub fn image_available(&self) -> &Semaphore {
        &self.image_available
    }

    /// Signaled when this frame's submission retires.
    #[inline]
    pub fn in_flight(&self) -> &Fence {
        &self.in_flight
    }
}

/// Creates `count` semaphores, one per swapchain image.
///
/// # Errors
///
/// Returns an error if any semaphore cannot be created.
pub fn create_semaphores(device: &Arc<Device>, count: usize) -> RhiResult<Vec<Semaphore>> {
    (0..count).map(|_| Semaphore::new(device.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_max_frames_in_flight_constant() {
        assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
    }

    #[test]
    fn test_sync_types_are_send_sync() {
        assert_send_sync::<Semaphore>();
        assert_send_sync::<Fence>();
        assert_send_sync::<FrameSync>();
    }
}
