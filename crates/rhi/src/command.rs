//! Command pool and command buffer recording.
//!
//! [`CommandPool`] owns the `VkCommandPool` the frame loop allocates from. The
//! recording helpers, from render pass scoping down to draws, are free
//! functions over raw handles because the buffers themselves are tracked by
//! the renderer's pool, not by RAII wrappers.
//!
//! ```no_run
//! use std::sync::Arc;
//! use swapframe_rhi::command::{self, CommandPool};
//! use swapframe_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>) -> swapframe_rhi::RhiResult<()> {
//! let family = device.queue_families().graphics_family.unwrap_or(0);
//! let pool = CommandPool::new(device.clone(), family)?;
//! let buffers = pool.allocate_command_buffers(3)?;
//! command::begin(&device, buffers[0])?;
//! command::end(&device, buffers[0])?;
//! pool.free_command_buffers(&buffers);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan command pool wrapper.
///
/// Created with `RESET_COMMAND_BUFFER` so each buffer is implicitly reset when
/// recording begins again.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a command pool for the given queue family.
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    /// Returns the Vulkan command pool handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates `count` primary command buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        debug!("Allocated {} command buffer(s)", buffers.len());
        Ok(buffers)
    }

    /// Returns buffers to the pool. The buffers must not be pending execution.
    pub fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        if buffers.is_empty() {
            return;
        }
        unsafe {
            self.device
                .handle()
                .free_command_buffers(self.pool, buffers);
        }
        debug!("Freed {} command buffer(s)", buffers.len());
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Begins recording into `buffer`.
///
/// # Errors
///
/// Returns an error if the buffer cannot enter the recording state.
pub fn begin(device: &Device, buffer: vk::CommandBuffer) -> RhiResult<()> {
    let begin_info = vk::CommandBufferBeginInfo::default();
    unsafe { device.handle().begin_command_buffer(buffer, &begin_info)? };
    Ok(())
}

/// Finishes recording into `buffer`.
///
/// # Errors
///
/// Returns an error if recording produced an invalid buffer.
pub fn end(device: &Device, buffer: vk::CommandBuffer) -> RhiResult<()> {
    unsafe { device.handle().end_command_buffer(buffer)? };
    Ok(())
}

/// Starts `render_pass` on `framebuffer`, then sets a full-extent viewport
/// and scissor.
pub fn begin_render_pass(
    device: &Device,
    buffer: vk::CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
    clear_values: &[vk::ClearValue],
) {
    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    let begin_info = vk::RenderPassBeginInfo::default()
        .render_pass(render_pass)
        .framebuffer(framebuffer)
        .render_area(render_area)
        .clear_values(clear_values);

    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };

    unsafe {
        let handle = device.handle();
        handle.cmd_begin_render_pass(buffer, &begin_info, vk::SubpassContents::INLINE);
        handle.cmd_set_viewport(buffer, 0, &[viewport]);
        handle.cmd_set_scissor(buffer, 0, &[render_area]);
    }
}

/// Ends the render pass started by [`begin_render_pass`].
pub fn end_render_pass(device: &Device, buffer: vk::CommandBuffer) {
    unsafe { device.handle().cmd_end_render_pass(buffer) };
}

/// Binds a graphics pipeline.
pub fn bind_pipeline(device: &Device, buffer: vk::CommandBuffer, pipeline: vk::Pipeline) {
    unsafe {
        device
            .handle()
            .cmd_bind_pipeline(buffer, vk::PipelineBindPoint::GRAPHICS, pipeline)
    };
}

/// Binds `vertex_buffer` at binding 0.
pub fn bind_vertex_buffer(device: &Device, buffer: vk::CommandBuffer, vertex_buffer: vk::Buffer) {
    unsafe {
        device
            .handle()
            .cmd_bind_vertex_buffers(buffer, 0, &[vertex_buffer], &[0])
    };
}

/// Pushes `data` at offset 0 for `stages`.
pub fn push_constants(
    device: &Device,
    buffer: vk::CommandBuffer,
    layout: vk::PipelineLayout,
    stages: vk::ShaderStageFlags,
    data: &[u8],
) {
    unsafe {
        device
            .handle()
            .cmd_push_constants(buffer, layout, stages, 0, data)
    };
}

/// Draws `vertex_count` non-indexed vertices, one instance.
pub fn draw(device: &Device, buffer: vk::CommandBuffer, vertex_count: u32) {
    unsafe { device.handle().cmd_draw(buffer, vertex_count, 1, 0, 0) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_pool_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandPool>();
    }
}
