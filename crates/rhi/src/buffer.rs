//! Host-visible GPU buffers.
//!
//! The demo uploads each model once and never touches it again, so every
//! [`Buffer`] lives in `CpuToGpu` memory and is written through its
//! persistent mapping. No staging copy is involved.
//!
//! ```no_run
//! use std::sync::Arc;
//! use swapframe_rhi::buffer::{Buffer, BufferUsage};
//! use swapframe_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>, vertices: &[u8]) -> swapframe_rhi::RhiResult<()> {
//! let buffer = Buffer::new_with_data(device, BufferUsage::Vertex, vertices)?;
//! assert_eq!(buffer.size(), vertices.len() as u64);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, PoisonError};

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// What a buffer is bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
        }
    }
}

/// `VkBuffer` plus its mapped allocation.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Creates an uninitialised buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// [`RhiError::InvalidArgument`] for a zero size, or the
    /// Vulkan/allocator error.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidArgument(
                "buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        // Partially built buffers are released by `Drop`.
        let mut built = Self {
            device,
            buffer,
            allocation: None,
            size,
            usage,
        };

        let allocation = {
            let mut allocator = built
                .device
                .allocator()?
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            allocator.allocate(&AllocationCreateDesc {
                name: usage.name(),
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?
        };
        unsafe {
            built
                .device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }
        built.allocation = Some(allocation);

        debug!("Created {} buffer: {} bytes", usage.name(), size);
        Ok(built)
    }

    /// Creates a buffer sized to `data` and fills it.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new) and [`write`](Self::write).
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let mut buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write(0, data)?;
        Ok(buffer)
    }

    /// Copies `data` into the mapping at `offset`.
    ///
    /// # Errors
    ///
    /// [`RhiError::InvalidArgument`] when the write runs past the end or
    /// the memory is not mapped.
    pub fn write(&mut self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        let range = checked_range(offset, data.len(), self.size)?;
        let mapped = self
            .allocation
            .as_mut()
            .and_then(Allocation::mapped_slice_mut)
            .ok_or_else(|| RhiError::InvalidArgument("buffer memory is not mapped".to_string()))?;
        mapped[range].copy_from_slice(data);
        Ok(())
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

/// Byte range `offset..offset + len`, if it fits within `size`.
fn checked_range(
    offset: vk::DeviceSize,
    len: usize,
    size: vk::DeviceSize,
) -> RhiResult<std::ops::Range<usize>> {
    let end = offset.checked_add(len as vk::DeviceSize);
    match end {
        Some(end) if end <= size => Ok(offset as usize..end as usize),
        _ => Err(RhiError::InvalidArgument(format!(
            "write of {} bytes at offset {} exceeds buffer size {}",
            len, offset, size
        ))),
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator() {
                Ok(allocator) => {
                    let mut allocator = allocator.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Err(e) = allocator.free(allocation) {
                        error!("Failed to free buffer allocation: {:?}", e);
                    }
                }
                Err(e) => error!("Buffer outlived its allocator: {}", e),
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }
        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_to_vk_usage() {
        assert_eq!(
            BufferUsage::Vertex.to_vk_usage(),
            vk::BufferUsageFlags::VERTEX_BUFFER
        );
        assert_eq!(
            BufferUsage::Index.to_vk_usage(),
            vk::BufferUsageFlags::INDEX_BUFFER
        );
    }

    #[test]
    fn test_buffer_usage_name() {
        assert_eq!(BufferUsage::Vertex.name(), "vertex");
        assert_eq!(BufferUsage::Index.name(), "index");
    }

    #[test]
    fn test_checked_range() {
        assert_eq!(checked_range(0, 20, 20).unwrap(), 0..20);
        assert_eq!(checked_range(8, 12, 20).unwrap(), 8..20);
        assert!(checked_range(8, 13, 20).is_err());
        assert!(checked_range(u64::MAX, 1, 20).is_err());
    }

    #[test]
    fn test_buffer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Buffer>();
    }
}
