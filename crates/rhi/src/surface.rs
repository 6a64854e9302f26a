//! Window surface ownership.

use ash::vk;
use tracing::debug;

/// RAII wrapper for a `vk::SurfaceKHR`.
///
/// The surface is created by the platform layer (which owns the window
/// handles) and handed over here together with its extension loader. The
/// Vulkan instance must outlive it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Take ownership of an already created surface.
    ///
    /// # Safety
    ///
    /// `handle` must be a live surface created from the instance `loader`
    /// was built for, and must not be destroyed elsewhere.
    pub unsafe fn from_raw(handle: vk::SurfaceKHR, loader: ash::khr::surface::Instance) -> Self {
        Self { handle, loader }
    }

    /// Raw surface handle, valid for the lifetime of `self`.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Surface extension loader for capability queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: the handle is owned exclusively by this wrapper (see `from_raw`).
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
        debug!("Vulkan surface destroyed");
    }
}
