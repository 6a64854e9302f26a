use std::sync::Arc;

use ash::vk;
use swapframe_rhi::command::{self, CommandPool};
use swapframe_rhi::depth::find_depth_format;
use swapframe_rhi::device::Device;
use swapframe_rhi::instance::Instance;
use swapframe_rhi::physical_device::select_physical_device;
use swapframe_rhi::surface::Surface;
use tracing::info;

use crate::backend::{DeviceContext, RenderPassBegin};
use crate::error::{FrameError, RenderResult};

/// Device-side Vulkan state shared by every chain.
///
/// Field order is drop order: the command pool and device go before the
/// surface, and the instance goes last.
pub struct VulkanContext {
    command_pool: CommandPool,
    device: Arc<Device>,
    depth_format: vk::Format,
    prefer_mailbox: bool,
    surface: Surface,
    instance: Instance,
}

impl VulkanContext {
    /// Picks a GPU that can present to `surface` and creates the device.
    ///
    /// # Errors
    ///
    /// [`FrameError::SurfaceConfiguration`] when no GPU qualifies or no
    /// depth format is supported; [`FrameError::DeviceLost`] for any other
    /// Vulkan failure.
    pub fn new(instance: Instance, surface: Surface, prefer_mailbox: bool) -> RenderResult<Self> {
        let gpu = select_physical_device(instance.handle(), &surface)?;
        let device = Device::new(&instance, &gpu)?;
        let depth_format = find_depth_format(instance.handle(), gpu.device)?;

        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or_else(|| FrameError::SurfaceConfiguration("no graphics queue".to_string()))?;
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;

        info!(
            "Vulkan context ready on '{}' (depth {:?}, mailbox {})",
            gpu.device_name(),
            depth_format,
            if prefer_mailbox { "preferred" } else { "off" }
        );

        Ok(Self {
            command_pool,
            device,
            depth_format,
            prefer_mailbox,
            surface,
            instance,
        })
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[inline]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Depth format every chain uses.
    #[inline]
    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    #[inline]
    pub fn prefer_mailbox(&self) -> bool {
        self.prefer_mailbox
    }
}

impl DeviceContext for VulkanContext {
    type CommandBuffer = vk::CommandBuffer;
    type RenderPass = vk::RenderPass;
    type Framebuffer = vk::Framebuffer;

    fn wait_idle(&self) -> RenderResult<()> {
        Ok(self.device.wait_idle()?)
    }

    fn allocate_command_buffers(&self, count: usize) -> RenderResult<Vec<vk::CommandBuffer>> {
        let count = u32::try_from(count)
            .map_err(|_| FrameError::protocol(format!("{} command buffers requested", count)))?;
        Ok(self.command_pool.allocate_command_buffers(count)?)
    }

    fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        self.command_pool.free_command_buffers(buffers);
    }

    fn begin_recording(&self, buffer: vk::CommandBuffer) -> RenderResult<()> {
        Ok(command::begin(&self.device, buffer)?)
    }

    fn end_recording(&self, buffer: vk::CommandBuffer) -> RenderResult<()> {
        Ok(command::end(&self.device, buffer)?)
    }

    fn begin_render_pass(
        &self,
        buffer: vk::CommandBuffer,
        begin: &RenderPassBegin<vk::RenderPass, vk::Framebuffer>,
    ) {
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: begin.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: begin.clear_depth,
                    stencil: begin.clear_stencil,
                },
            },
        ];
        command::begin_render_pass(
            &self.device,
            buffer,
            begin.render_pass,
            begin.framebuffer,
            begin.extent.into(),
            &clear_values,
        );
    }

    fn end_render_pass(&self, buffer: vk::CommandBuffer) {
        command::end_render_pass(&self.device, buffer);
    }
}
