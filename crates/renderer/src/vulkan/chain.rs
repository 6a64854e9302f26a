use std::sync::Arc;

use ash::vk;
use swapframe_rhi::depth::DepthImage;
use swapframe_rhi::device::Device;
use swapframe_rhi::render_pass::{Framebuffer, RenderPass};
use swapframe_rhi::swapchain::{Swapchain, SwapchainSupportDetails};
use swapframe_rhi::sync::{self, FrameSync, MAX_FRAMES_IN_FLIGHT, Semaphore};
use tracing::{debug, info, trace};

use super::chain_status;
use super::context::VulkanContext;
use crate::backend::{ChainStatus, PresentationChain};
use crate::error::{FrameError, RenderResult};
use crate::surface::Extent;

/// Swapchain, depth images, framebuffers, render pass and frame sync.
///
/// Fields drop top to bottom, so everything that refers to the swapchain
/// images goes before the swapchain itself.
pub struct VulkanChain {
    framebuffers: Vec<Framebuffer>,
    depth_images: Vec<DepthImage>,
    render_pass: RenderPass,
    frame_syncs: Vec<FrameSync>,
    /// Signaled by the submission for slot `i`, waited on by its present.
    render_finished: Vec<Semaphore>,
    /// Fence of the submission that last used slot `i`, or null.
    images_in_flight: Vec<vk::Fence>,
    current_frame: usize,
    swapchain: Swapchain,
    device: Arc<Device>,
}

impl VulkanChain {
    /// Colour format of the swapchain images.
    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.render_pass.color_format()
    }

    #[inline]
    pub fn depth_format(&self) -> vk::Format {
        self.render_pass.depth_format()
    }

    /// Depth attachment of `slot`.
    pub fn depth_image(&self, slot: usize) -> Option<&DepthImage> {
        self.depth_images.get(slot)
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.swapchain.present_mode()
    }

    fn check_slot(&self, slot: usize) -> RenderResult<()> {
        if slot < self.framebuffers.len() {
            Ok(())
        } else {
            Err(FrameError::IndexOutOfRange {
                index: slot,
                len: self.framebuffers.len(),
            })
        }
    }
}

impl PresentationChain for VulkanChain {
    type Device = VulkanContext;

    fn construct(
        context: &VulkanContext,
        extent: Extent,
        previous: Option<&Self>,
    ) -> RenderResult<Self> {
        let device = context.device().clone();
        let swapchain = Swapchain::new(
            device.clone(),
            context.surface(),
            extent.into(),
            previous.map(|p| &p.swapchain),
            context.prefer_mailbox(),
        )
        .map_err(FrameError::construction)?;

        let color_format = swapchain.format();
        let depth_format = context.depth_format();
        if let Some(previous) = previous {
            if previous.color_format() != color_format || previous.depth_format() != depth_format {
                return Err(FrameError::SurfaceConfiguration(format!(
                    "image formats changed from {:?}/{:?} to {:?}/{:?}",
                    previous.color_format(),
                    previous.depth_format(),
                    color_format,
                    depth_format
                )));
            }
            debug!(
                "Replacing chain of {} slot(s) at {}",
                previous.slot_count(),
                previous.extent()
            );
        }

        let actual: Extent = swapchain.extent().into();
        if actual != extent {
            debug!("Surface dictated {} for requested {}", actual, extent);
        }

        let render_pass = RenderPass::new(device.clone(), color_format, depth_format)?;

        let image_count = swapchain.image_count();
        let mut depth_images = Vec::with_capacity(image_count);
        let mut framebuffers = Vec::with_capacity(image_count);
        for &color_view in swapchain.image_views() {
            let depth = DepthImage::new(device.clone(), swapchain.extent(), depth_format)?;
            framebuffers.push(Framebuffer::new(
                device.clone(),
                &render_pass,
                color_view,
                depth.image_view(),
                swapchain.extent(),
            )?);
            depth_images.push(depth);
        }

        let frame_syncs = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let render_finished = sync::create_semaphores(&device, image_count)?;

        info!(
            "Presentation chain built: {} slot(s) at {}, {:?}",
            image_count,
            actual,
            swapchain.present_mode()
        );

        Ok(Self {
            framebuffers,
            depth_images,
            render_pass,
            frame_syncs,
            render_finished,
            images_in_flight: vec![vk::Fence::null(); image_count],
            current_frame: 0,
            swapchain,
            device,
        })
    }

    fn is_compatible(&self, context: &VulkanContext) -> RenderResult<bool> {
        let support =
            SwapchainSupportDetails::query(self.device.physical_device(), context.surface())?;
        let color_format = support.surface_format()?.format;
        let compatible =
            color_format == self.color_format() && context.depth_format() == self.depth_format();
        if !compatible {
            debug!(
                "Surface now prefers {:?}/{:?}, chain uses {:?}/{:?}",
                color_format,
                context.depth_format(),
                self.color_format(),
                self.depth_format()
            );
        }
        Ok(compatible)
    }

    fn acquire_next_image(&mut self) -> RenderResult<(usize, ChainStatus)> {
        let frame = &self.frame_syncs[self.current_frame];
        frame.in_flight().wait(u64::MAX)?;

        let acquired = self
            .swapchain
            .acquire_next_image(frame.image_available().handle());
        let (index, status) = match acquired {
            Ok((index, suboptimal)) => (index as usize, chain_status(Ok(suboptimal))?),
            Err(e) => return Ok((0, chain_status(Err(e))?)),
        };
        self.check_slot(index)?;

        // The slot's command buffer is about to be re-recorded.
        let guard = self.images_in_flight[index];
        if guard != vk::Fence::null() {
            sync::wait_for(&self.device, guard, u64::MAX)?;
        }

        trace!("Acquired slot {} ({:?})", index, status);
        Ok((index, status))
    }

    fn submit(&mut self, buffer: vk::CommandBuffer, slot: usize) -> RenderResult<ChainStatus> {
        self.check_slot(slot)?;
        let frame = &self.frame_syncs[self.current_frame];
        let fence = frame.in_flight();

        let wait_semaphores = [frame.image_available().handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.render_finished[slot].handle()];
        let command_buffers = [buffer];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        fence.reset()?;
        unsafe {
            self.device.handle().queue_submit(
                self.device.graphics_queue(),
                &[submit_info],
                fence.handle(),
            )?;
        }
        self.images_in_flight[slot] = fence.handle();
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;

        let presented = self.swapchain.present(
            self.device.present_queue(),
            slot as u32,
            signal_semaphores[0],
        );
        let status = chain_status(presented)?;
        if status != ChainStatus::Ready {
            debug!("Present reported {:?}", status);
        }
        Ok(status)
    }

    fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    fn framebuffer(&self, slot: usize) -> RenderResult<vk::Framebuffer> {
        self.check_slot(slot)?;
        Ok(self.framebuffers[slot].handle())
    }

    fn extent(&self) -> Extent {
        self.swapchain.extent().into()
    }

    fn slot_count(&self) -> usize {
        self.framebuffers.len()
    }
}
