//! Window management using winit.
//!
//! The [`Window`] owns its event loop and drives it with
//! `pump_app_events`, so the render loop stays in charge: one non-blocking
//! pump per frame, and a blocking pump only while the window is minimized.

use std::ffi::c_char;
use std::sync::Arc;
use std::time::Duration;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use swapframe_core::{Error, Result, WindowSettings};
use swapframe_renderer::{Extent, SurfaceProvider};
use swapframe_rhi::instance::Instance;
use swapframe_rhi::surface::Surface;

/// Window state updated from winit callbacks.
struct WindowState {
    attributes: WindowAttributes,
    window: Option<Arc<WinitWindow>>,
    extent: Extent,
    resized: bool,
    close_requested: bool,
    creation_error: Option<String>,
}

impl WindowState {
    fn new(attributes: WindowAttributes, extent: Extent) -> Self {
        Self {
            attributes,
            window: None,
            extent,
            resized: false,
            close_requested: false,
            creation_error: None,
        }
    }

    fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                let extent = Extent::new(size.width, size.height);
                if extent != self.extent {
                    debug!("Window resized: {}", extent);
                    self.extent = extent;
                    self.resized = true;
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.close_requested = true;
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                let size = window.inner_size();
                self.extent = Extent::new(size.width, size.height);
                info!("Window created: {}", self.extent);
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                self.creation_error = Some(e.to_string());
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.handle_event(&event);
    }
}

/// A resizable window plus the event loop feeding it.
///
/// Implements [`SurfaceProvider`]: the drawable extent tracks resize events,
/// and the resize flag stays set until the renderer clears it.
pub struct Window {
    state: WindowState,
    event_loop: EventLoop<()>,
}

impl Window {
    /// Creates the event loop and the window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Window`] if the event loop or window cannot be
    /// created.
    pub fn new(settings: &WindowSettings) -> Result<Self> {
        let mut event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;

        let attributes = WindowAttributes::default()
            .with_title(settings.title.clone())
            .with_inner_size(PhysicalSize::new(settings.width, settings.height))
            .with_resizable(true);
        let mut state =
            WindowState::new(attributes, Extent::new(settings.width, settings.height));

        // The window is created from `resumed`, delivered on the first pump.
        while state.window.is_none() {
            let status = event_loop.pump_app_events(Some(Duration::ZERO), &mut state);
            if let Some(error) = state.creation_error.take() {
                return Err(Error::Window(error));
            }
            if let PumpStatus::Exit(code) = status {
                return Err(Error::Window(format!(
                    "event loop exited with code {} before the window was created",
                    code
                )));
            }
        }

        Ok(Self { state, event_loop })
    }

    /// Processes pending events without blocking.
    pub fn poll_events(&mut self) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state);
        if let PumpStatus::Exit(_) = status {
            self.state.close_requested = true;
        }
    }

    /// The user asked to close the window.
    #[inline]
    pub fn should_close(&self) -> bool {
        self.state.close_requested
    }

    /// Instance extensions needed to create a surface for this window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Vulkan`] if the display is not supported.
    pub fn required_instance_extensions(&self) -> Result<Vec<*const c_char>> {
        let display = self
            .winit_window()?
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;
        let extensions = ash_window::enumerate_required_extensions(display.as_raw())
            .map_err(|e| Error::Vulkan(format!("Failed to enumerate surface extensions: {}", e)))?;
        Ok(extensions.to_vec())
    }

    /// Creates a Vulkan surface for this window.
    ///
    /// The surface must be dropped before the window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Vulkan`] if surface creation fails.
    pub fn create_surface(&self, instance: &Instance) -> Result<Surface> {
        let window = self.winit_window()?;
        let display = window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;
        let handle = window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: both handles come from a live winit window, and the
        // instance was created with the extensions reported above.
        let raw = unsafe {
            ash_window::create_surface(
                instance.entry(),
                instance.handle(),
                display.as_raw(),
                handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };
        let loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());

        info!("Vulkan surface created");
        // SAFETY: `raw` was just created from `loader`'s instance and is
        // owned by nothing else.
        Ok(unsafe { Surface::from_raw(raw, loader) })
    }

    pub fn set_title(&self, title: &str) {
        if let Some(window) = &self.state.window {
            window.set_title(title);
        }
    }

    fn winit_window(&self) -> Result<&WinitWindow> {
        self.state
            .window
            .as_deref()
            .ok_or_else(|| Error::Window("window not created".to_string()))
    }
}

impl SurfaceProvider for Window {
    fn current_extent(&self) -> Extent {
        self.state.extent
    }

    fn was_resized(&self) -> bool {
        self.state.resized
    }

    fn clear_resized_flag(&mut self) {
        self.state.resized = false;
    }

    fn wait_for_events(&mut self) {
        let status = self.event_loop.pump_app_events(None, &mut self.state);
        if let PumpStatus::Exit(_) = status {
            self.state.close_requested = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WindowState {
        WindowState::new(WindowAttributes::default(), Extent::new(800, 600))
    }

    #[test]
    fn test_resize_sets_sticky_flag() {
        let mut state = state();
        state.handle_event(&WindowEvent::Resized(PhysicalSize::new(1024, 768)));
        assert!(state.resized);
        assert_eq!(state.extent, Extent::new(1024, 768));

        state.handle_event(&WindowEvent::Focused(true));
        assert!(state.resized);
    }

    #[test]
    fn test_same_size_is_not_a_resize() {
        let mut state = state();
        state.handle_event(&WindowEvent::Resized(PhysicalSize::new(800, 600)));
        assert!(!state.resized);
    }

    #[test]
    fn test_minimize_reports_zero_extent() {
        let mut state = state();
        state.handle_event(&WindowEvent::Resized(PhysicalSize::new(0, 0)));
        assert!(state.extent.is_zero());
        assert!(state.resized);
    }

    #[test]
    fn test_close_requested() {
        let mut state = state();
        assert!(!state.close_requested);
        state.handle_event(&WindowEvent::CloseRequested);
        assert!(state.close_requested);
    }
}
