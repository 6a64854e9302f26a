//! Contracts between the frame controller and the graphics backend.
//!
//! [`DeviceContext`] is the device side: idle waits, command buffer
//! allocation and the handful of commands the controller records itself.
//! [`PresentationChain`] is the set of presentable images with their render
//! pass; it is built against a device context and replaced wholesale when
//! the surface changes.

use std::fmt::Debug;

use crate::error::RenderResult;
use crate::surface::Extent;

/// Colour the render pass clears to.
pub const CLEAR_COLOR: [f32; 4] = [0.01, 0.01, 0.01, 1.0];
/// Depth the render pass clears to.
pub const CLEAR_DEPTH: f32 = 1.0;
/// Stencil the render pass clears to.
pub const CLEAR_STENCIL: u32 = 0;

/// Outcome of acquiring or presenting an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    /// Nothing to do.
    Ready,
    /// The chain no longer matches the surface and must be rebuilt before
    /// it can be used again.
    OutOfDate,
    /// Still presentable, but should be rebuilt once the frame is done.
    SuboptimalButUsable,
}

impl ChainStatus {
    /// Anything other than [`ChainStatus::Ready`].
    #[inline]
    pub fn needs_rebuild(self) -> bool {
        self != ChainStatus::Ready
    }
}

/// Everything needed to open the render pass on one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassBegin<P, F> {
    pub render_pass: P,
    pub framebuffer: F,
    /// Render area, viewport and scissor.
    pub extent: Extent,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

impl<P, F> RenderPassBegin<P, F> {
    /// Full-extent begin info with the fixed clear values.
    pub fn new(render_pass: P, framebuffer: F, extent: Extent) -> Self {
        Self {
            render_pass,
            framebuffer,
            extent,
            clear_color: CLEAR_COLOR,
            clear_depth: CLEAR_DEPTH,
            clear_stencil: CLEAR_STENCIL,
        }
    }
}

/// Logical device operations used by the frame loop.
pub trait DeviceContext {
    /// Handle of a primary command buffer.
    type CommandBuffer: Copy + Eq + Debug;
    /// Handle of the presentation render pass.
    type RenderPass: Copy + Debug;
    /// Handle of a slot's framebuffer.
    type Framebuffer: Copy + Debug;

    /// Blocks until the device has no work in flight.
    fn wait_idle(&self) -> RenderResult<()>;

    fn allocate_command_buffers(&self, count: usize) -> RenderResult<Vec<Self::CommandBuffer>>;

    /// Frees a batch of buffers. None of them may be pending execution.
    fn free_command_buffers(&self, buffers: &[Self::CommandBuffer]);

    /// Puts `buffer` into the recording state, discarding earlier contents.
    fn begin_recording(&self, buffer: Self::CommandBuffer) -> RenderResult<()>;

    fn end_recording(&self, buffer: Self::CommandBuffer) -> RenderResult<()>;

    /// Opens the render pass and sets a full-extent viewport and scissor.
    fn begin_render_pass(
        &self,
        buffer: Self::CommandBuffer,
        begin: &RenderPassBegin<Self::RenderPass, Self::Framebuffer>,
    );

    fn end_render_pass(&self, buffer: Self::CommandBuffer);
}

/// Command buffer handle type of a chain's device.
pub type CommandBufferOf<C> =
    <<C as PresentationChain>::Device as DeviceContext>::CommandBuffer;
/// Render pass handle type of a chain's device.
pub type RenderPassOf<C> = <<C as PresentationChain>::Device as DeviceContext>::RenderPass;
/// Framebuffer handle type of a chain's device.
pub type FramebufferOf<C> = <<C as PresentationChain>::Device as DeviceContext>::Framebuffer;

/// A swap chain of presentable slots sharing one render pass.
///
/// Immutable once constructed apart from the acquire/submit bookkeeping.
/// Every framebuffer is compatible with [`render_pass`](Self::render_pass)
/// and sized to [`extent`](Self::extent).
pub trait PresentationChain: Sized {
    type Device: DeviceContext;

    /// Builds a chain for a non-zero `extent`.
    ///
    /// `previous`, when given, is the chain being replaced and must be
    /// [compatible](Self::is_compatible). It may be used to overlap
    /// teardown; its owner drops it once the new chain exists.
    ///
    /// # Errors
    ///
    /// [`FrameError::SurfaceConfiguration`](crate::FrameError::SurfaceConfiguration)
    /// when the surface cannot be presented to, or when the image formats
    /// differ from `previous`.
    fn construct(
        device: &Self::Device,
        extent: Extent,
        previous: Option<&Self>,
    ) -> RenderResult<Self>;

    /// Whether a chain built now would use this chain's attachment formats,
    /// so that this chain can seed it and its render pass stays valid for
    /// existing pipelines.
    fn is_compatible(&self, device: &Self::Device) -> RenderResult<bool>;

    /// Blocks until a slot is free and returns it.
    ///
    /// With [`ChainStatus::OutOfDate`] the slot is meaningless.
    fn acquire_next_image(&mut self) -> RenderResult<(usize, ChainStatus)>;

    /// Submits `buffer` for `slot` and presents the slot.
    fn submit(
        &mut self,
        buffer: CommandBufferOf<Self>,
        slot: usize,
    ) -> RenderResult<ChainStatus>;

    fn render_pass(&self) -> RenderPassOf<Self>;

    /// Framebuffer of `slot`.
    ///
    /// # Errors
    ///
    /// [`FrameError::IndexOutOfRange`](crate::FrameError::IndexOutOfRange)
    /// when `slot >= slot_count()`.
    fn framebuffer(&self, slot: usize) -> RenderResult<FramebufferOf<Self>>;

    fn extent(&self) -> Extent;

    fn slot_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_values() {
        assert_eq!(CLEAR_COLOR, [0.01, 0.01, 0.01, 1.0]);
        assert_eq!(CLEAR_DEPTH, 1.0);
        assert_eq!(CLEAR_STENCIL, 0);
    }

    #[test]
    fn test_render_pass_begin_uses_fixed_clears() {
        let begin = RenderPassBegin::new(1u8, 2u8, Extent::new(640, 480));
        assert_eq!(begin.clear_color, CLEAR_COLOR);
        assert_eq!(begin.clear_depth, CLEAR_DEPTH);
        assert_eq!(begin.extent, Extent::new(640, 480));
    }

    #[test]
    fn test_needs_rebuild() {
        assert!(!ChainStatus::Ready.needs_rebuild());
        assert!(ChainStatus::OutOfDate.needs_rebuild());
        assert!(ChainStatus::SuboptimalButUsable.needs_rebuild());
    }
}
