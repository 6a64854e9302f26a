//! One reusable command buffer per presentation slot.

use tracing::debug;

use crate::backend::DeviceContext;
use crate::error::{FrameError, RenderResult};

/// Command buffers index-aligned with the chain's slots.
///
/// The pool only tracks handles; allocation and freeing go through the
/// [`DeviceContext`] that owns the underlying API pool.
#[derive(Debug)]
pub struct CommandBufferPool<B> {
    buffers: Vec<B>,
}

impl<B> Default for CommandBufferPool<B> {
    fn default() -> Self {
        Self {
            buffers: Vec::new(),
        }
    }
}

impl<B: Copy + Eq + std::fmt::Debug> CommandBufferPool<B> {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the pool hold exactly `count` buffers.
    ///
    /// A no-op when it already does. Otherwise every existing buffer is
    /// freed in one batch and `count` fresh ones are allocated, so handles
    /// obtained before a resize are never valid afterwards.
    ///
    /// # Errors
    ///
    /// Propagates allocation failure; the pool is left empty in that case.
    pub fn ensure_size<D>(&mut self, device: &D, count: usize) -> RenderResult<()>
    where
        D: DeviceContext<CommandBuffer = B>,
    {
        if self.buffers.len() == count {
            return Ok(());
        }

        debug!(
            "Resizing command buffer pool: {} -> {}",
            self.buffers.len(),
            count
        );
        self.free_all(device);

        let buffers = device.allocate_command_buffers(count)?;
        if buffers.len() != count {
            device.free_command_buffers(&buffers);
            return Err(FrameError::DeviceLost(format!(
                "requested {} command buffers, got {}",
                count,
                buffers.len()
            )));
        }
        self.buffers = buffers;
        Ok(())
    }

    /// Buffer for `index`.
    ///
    /// # Errors
    ///
    /// [`FrameError::IndexOutOfRange`] when `index >= len()`.
    pub fn get(&self, index: usize) -> RenderResult<B> {
        self.buffers
            .get(index)
            .copied()
            .ok_or(FrameError::IndexOutOfRange {
                index,
                len: self.buffers.len(),
            })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Whether `buffer` is one of the live handles.
    pub fn contains(&self, buffer: B) -> bool {
        self.buffers.contains(&buffer)
    }

    #[inline]
    pub fn handles(&self) -> &[B] {
        &self.buffers
    }

    /// Frees every buffer and empties the pool.
    pub fn free_all<D>(&mut self, device: &D)
    where
        D: DeviceContext<CommandBuffer = B>,
    {
        if self.buffers.is_empty() {
            return;
        }
        device.free_command_buffers(&self.buffers);
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::backend::RenderPassBegin;

    #[derive(Default)]
    struct CountingDevice {
        next: RefCell<u32>,
        allocate_calls: RefCell<usize>,
        freed: RefCell<Vec<Vec<u32>>>,
        short_allocation: bool,
    }

    impl DeviceContext for CountingDevice {
        type CommandBuffer = u32;
        type RenderPass = ();
        type Framebuffer = ();

        fn wait_idle(&self) -> RenderResult<()> {
            Ok(())
        }

        fn allocate_command_buffers(&self, count: usize) -> RenderResult<Vec<u32>> {
            *self.allocate_calls.borrow_mut() += 1;
            let count = if self.short_allocation {
                count.saturating_sub(1)
            } else {
                count
            };
            let mut next = self.next.borrow_mut();
            Ok((0..count)
                .map(|_| {
                    *next += 1;
                    *next
                })
                .collect())
        }

        fn free_command_buffers(&self, buffers: &[u32]) {
            self.freed.borrow_mut().push(buffers.to_vec());
        }

        fn begin_recording(&self, _buffer: u32) -> RenderResult<()> {
            Ok(())
        }

        fn end_recording(&self, _buffer: u32) -> RenderResult<()> {
            Ok(())
        }

        fn begin_render_pass(&self, _buffer: u32, _begin: &RenderPassBegin<(), ()>) {}

        fn end_render_pass(&self, _buffer: u32) {}
    }

    #[test]
    fn test_ensure_size_allocates() {
        let device = CountingDevice::default();
        let mut pool = CommandBufferPool::new();
        assert!(pool.is_empty());

        pool.ensure_size(&device, 3).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.handles(), &[1, 2, 3]);
        assert!(device.freed.borrow().is_empty());
    }

    #[test]
    fn test_ensure_size_is_idempotent() {
        let device = CountingDevice::default();
        let mut pool = CommandBufferPool::new();
        pool.ensure_size(&device, 2).unwrap();
        pool.ensure_size(&device, 2).unwrap();

        assert_eq!(*device.allocate_calls.borrow(), 1);
        assert_eq!(pool.handles(), &[1, 2]);
    }

    #[test]
    fn test_resize_frees_old_batch() {
        let device = CountingDevice::default();
        let mut pool = CommandBufferPool::new();
        pool.ensure_size(&device, 2).unwrap();
        pool.ensure_size(&device, 3).unwrap();

        assert_eq!(*device.freed.borrow(), vec![vec![1, 2]]);
        assert_eq!(pool.handles(), &[3, 4, 5]);
        assert!(!pool.contains(1));
        assert!(pool.contains(4));
    }

    #[test]
    fn test_get_out_of_range() {
        let device = CountingDevice::default();
        let mut pool = CommandBufferPool::new();
        pool.ensure_size(&device, 2).unwrap();

        assert_eq!(pool.get(1), Ok(2));
        assert_eq!(
            pool.get(2),
            Err(FrameError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_short_allocation_is_rejected() {
        let device = CountingDevice {
            short_allocation: true,
            ..Default::default()
        };
        let mut pool = CommandBufferPool::new();

        assert!(matches!(
            pool.ensure_size(&device, 3),
            Err(FrameError::DeviceLost(_))
        ));
        assert!(pool.is_empty());
        assert_eq!(*device.freed.borrow(), vec![vec![1, 2]]);
    }

    #[test]
    fn test_free_all() {
        let device = CountingDevice::default();
        let mut pool = CommandBufferPool::new();
        pool.ensure_size(&device, 2).unwrap();
        pool.free_all(&device);
        pool.free_all(&device);

        assert!(pool.is_empty());
        assert_eq!(device.freed.borrow().len(), 1);
    }

    #[test]
    fn test_pool_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandBufferPool<ash::vk::CommandBuffer>>();
        assert_send::<CommandBufferPool<u32>>();
    }
}
