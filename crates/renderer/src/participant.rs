//! Code that records draw commands inside the render pass.

use crate::backend::DeviceContext;
use crate::error::RenderResult;
use crate::surface::Extent;

/// What a participant gets to see of the frame being recorded.
///
/// Valid only between the frame controller's `begin_render_pass` and
/// `end_render_pass` calls for this frame.
pub struct FrameContext<'a, D: DeviceContext> {
    pub device: &'a D,
    pub command_buffer: D::CommandBuffer,
    pub render_pass: D::RenderPass,
    pub slot: usize,
    pub extent: Extent,
    /// Number of frames submitted before this one.
    pub frame_index: u64,
}

impl<D: DeviceContext> FrameContext<'_, D> {
    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.extent.aspect_ratio()
    }
}

/// A pipeline or drawable recording into the frame's command buffer.
pub trait RenderPassParticipant<D: DeviceContext> {
    /// Records this participant's commands.
    ///
    /// # Errors
    ///
    /// Any error abandons the frame.
    fn record(&mut self, frame: &FrameContext<'_, D>) -> RenderResult<()>;
}

impl<D, F> RenderPassParticipant<D> for F
where
    D: DeviceContext,
    F: FnMut(&FrameContext<'_, D>) -> RenderResult<()>,
{
    fn record(&mut self, frame: &FrameContext<'_, D>) -> RenderResult<()> {
        self(frame)
    }
}
