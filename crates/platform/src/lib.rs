//! Platform layer: the window the renderer presents to.
//!
//! - Window creation and event pumping via winit
//! - The [`SurfaceProvider`](swapframe_renderer::SurfaceProvider) contract
//!   (extent, sticky resize flag, blocking wait while minimized)
//! - Instance extension discovery and Vulkan surface creation via
//!   `ash-window`

mod window;

pub use window::Window;
