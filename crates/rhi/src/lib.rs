//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Thin RAII wrappers over `ash` for the objects a presentation chain needs:
//! - Instance and physical device selection
//! - Logical device, queues and memory allocator
//! - Window surface
//! - Command pool
//! - Swapchain, render pass, framebuffers and depth images
//! - Semaphores and fences
//! - WGSL shaders, graphics pipelines and vertex buffers for the demo scene

mod error;

pub mod buffer;
pub mod command;
pub mod depth;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
