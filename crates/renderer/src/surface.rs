//! The drawable surface as seen by the frame controller.

use ash::vk;

/// Pixel size of a surface. Zero in either dimension means the surface is
/// not currently presentable (typically a minimized window).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Either dimension is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height; 1.0 for a zero-height extent.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<vk::Extent2D> for Extent {
    fn from(extent: vk::Extent2D) -> Self {
        Self::new(extent.width, extent.height)
    }
}

impl From<Extent> for vk::Extent2D {
    fn from(extent: Extent) -> Self {
        vk::Extent2D {
            width: extent.width,
            height: extent.height,
        }
    }
}

/// Supplies the current surface size and reports resizes.
///
/// Implemented by the window layer. The frame controller polls
/// [`was_resized`](Self::was_resized) once per submitted frame and only
/// calls [`wait_for_events`](Self::wait_for_events) while the extent is zero.
pub trait SurfaceProvider {
    /// Current drawable size in pixels.
    fn current_extent(&self) -> Extent;

    /// Whether a resize happened since the flag was last cleared. Sticky.
    fn was_resized(&self) -> bool;

    fn clear_resized_flag(&mut self);

    /// Blocks until at least one window event has been processed.
    fn wait_for_events(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_extent() {
        assert!(Extent::new(0, 0).is_zero());
        assert!(Extent::new(800, 0).is_zero());
        assert!(Extent::new(0, 600).is_zero());
        assert!(!Extent::new(1, 1).is_zero());
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(Extent::new(800, 400).aspect_ratio(), 2.0);
        assert_eq!(Extent::new(800, 0).aspect_ratio(), 1.0);
    }

    #[test]
    fn test_vk_conversion() {
        let extent = Extent::new(1280, 720);
        let raw: vk::Extent2D = extent.into();
        assert_eq!((raw.width, raw.height), (1280, 720));
        assert_eq!(Extent::from(raw), extent);
        assert_eq!(extent.to_string(), "1280x720");
    }
}
