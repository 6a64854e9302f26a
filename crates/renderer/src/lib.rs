//! Frame lifecycle for a swapchain-based renderer.
//!
//! This crate owns the part of rendering that has to be right every frame:
//! - [`FrameController`]: begin/end frame and render pass, acquire, submit,
//!   present, and rebuilding the presentation chain when it goes stale
//! - [`CommandBufferPool`]: one command buffer per presentation slot
//! - [`SurfaceProvider`], [`DeviceContext`] and [`PresentationChain`]: the
//!   seams to the window and the graphics API
//! - [`vulkan`]: the Vulkan implementation of those seams

pub mod backend;
pub mod command_pool;
mod error;
pub mod frame_controller;
pub mod participant;
pub mod surface;
pub mod vulkan;

pub use backend::{
    CLEAR_COLOR, CLEAR_DEPTH, CLEAR_STENCIL, ChainStatus, CommandBufferOf, DeviceContext,
    PresentationChain, RenderPassBegin,
};
pub use command_pool::CommandBufferPool;
pub use error::{FrameError, RenderResult};
pub use frame_controller::{FrameController, FrameState};
pub use participant::{FrameContext, RenderPassParticipant};
pub use surface::{Extent, SurfaceProvider};
