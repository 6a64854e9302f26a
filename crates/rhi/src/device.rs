//! Vulkan logical device and queue management.
//!
//! The [`Device`] owns the logical device, the graphics and present queues,
//! and the `gpu-allocator` instance used for the depth attachments.
//!
//! ```no_run
//! use swapframe_rhi::device::Device;
//! use swapframe_rhi::instance::Instance;
//! use swapframe_rhi::physical_device::select_physical_device;
//! use swapframe_rhi::surface::Surface;
//!
//! # fn example(instance: &Instance, surface: &Surface) -> swapframe_rhi::RhiResult<()> {
//! let gpu = select_physical_device(instance.handle(), surface)?;
//! let device = Device::new(instance, &gpu)?;
//! device.wait_idle()?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices, REQUIRED_DEVICE_EXTENSIONS};

/// Vulkan logical device wrapper.
///
/// Shared through `Arc`; every RAII wrapper in this crate holds a clone so the
/// device outlives the objects created from it.
pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    // Dropped explicitly before the device in `Drop`.
    allocator: Option<Mutex<Allocator>>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilyIndices,
    swapchain_loader: ash::khr::swapchain::Device,
}

impl Device {
    /// Creates the logical device on the selected GPU.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation or allocator setup fails, or if
    /// `physical_device_info` lacks a graphics or present family.
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> RhiResult<Arc<Self>> {
        let queue_families = physical_device_info.queue_families;
        let (graphics_family, present_family) =
            match (queue_families.graphics_family, queue_families.present_family) {
                (Some(g), Some(p)) => (g, p),
                _ => {
                    return Err(RhiError::InvalidArgument(
                        "queue families incomplete".to_string(),
                    ));
                }
            };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let extension_names: Vec<*const std::ffi::c_char> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };
        info!(
            "Logical device created with {} extension(s)",
            extension_names.len()
        );

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };
        debug!(
            "Queues retrieved (graphics family {}, present family {})",
            graphics_family, present_family
        );

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: physical_device_info.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e.into());
            }
        };
        info!("GPU memory allocator initialized");

        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), &device);

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            allocator: Some(Mutex::new(allocator)),
            graphics_queue,
            present_queue,
            queue_families,
            swapchain_loader,
        }))
    }

    /// Returns the Vulkan logical device handle.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    /// Returns the physical device handle.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Returns the queue family indices.
    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Returns the `VK_KHR_swapchain` function table.
    #[inline]
    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    /// Returns the memory allocator.
    ///
    /// # Errors
    ///
    /// Only fails while the device is being torn down.
    pub fn allocator(&self) -> RhiResult<&Mutex<Allocator>> {
        self.allocator
            .as_ref()
            .ok_or_else(|| RhiError::InvalidArgument("allocator already released".to_string()))
    }

    /// Blocks until all queues are idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the device was lost.
    pub fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // The allocator frees its memory blocks through the device.
        drop(self.allocator.take());
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// ash handles are plain data and the allocator sits behind a Mutex.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_device_is_send_sync() {
        assert_send_sync::<Device>();
    }
}
