//! Transform component for game objects.
//!
//! Rotation is stored as Tait-Bryan angles in radians and applied in Y, X, Z
//! order, so the model matrix is `translate * rotY * rotX * rotZ * scale`.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use swapframe_scene::TransformComponent;
//!
//! let transform = TransformComponent::new()
//!     .with_translation(Vec3::new(1.0, 0.0, 0.0))
//!     .with_scale(Vec3::splat(2.0));
//!
//! let moved = transform.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
//! assert_eq!(moved, Vec3::new(3.0, 0.0, 0.0));
//! ```

use glam::{EulerRot, Mat4, Vec3};

/// Position, scale and orientation of a game object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformComponent {
    pub translation: Vec3,
    pub scale: Vec3,
    /// Rotation about X, Y and Z in radians.
    pub rotation: Vec3,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
        }
    }
}

impl TransformComponent {
    /// Identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Adds `delta` radians to the rotation, wrapping each angle into
    /// `[0, 2π)`.
    pub fn rotate(&mut self, delta: Vec3) {
        let tau = std::f32::consts::TAU;
        let r = self.rotation + delta;
        self.rotation = Vec3::new(r.x.rem_euclid(tau), r.y.rem_euclid(tau), r.z.rem_euclid(tau));
    }

    /// Model matrix: `translate * rotY * rotX * rotZ * scale`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_euler(
                EulerRot::YXZ,
                self.rotation.y,
                self.rotation.x,
                self.rotation.z,
            )
            * Mat4::from_scale(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    const EPSILON: f32 = 1e-5;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < EPSILON
    }

    #[test]
    fn test_identity() {
        assert_eq!(TransformComponent::new().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_scale_applied_before_translation() {
        let t = TransformComponent::new()
            .with_translation(Vec3::new(0.0, 5.0, 0.0))
            .with_scale(Vec3::new(2.0, 3.0, 4.0));
        let p = t.matrix().transform_point3(Vec3::ONE);
        assert!(approx(p, Vec3::new(2.0, 8.0, 4.0)));
    }

    #[test]
    fn test_rotation_order_y_x_z() {
        // Z is applied first, then X, then Y.
        let t = TransformComponent::new().with_rotation(Vec3::new(FRAC_PI_2, FRAC_PI_2, 0.0));
        let expected = Mat4::from_rotation_y(FRAC_PI_2) * Mat4::from_rotation_x(FRAC_PI_2);

        let p = Vec3::new(0.0, 1.0, 0.0);
        assert!(approx(
            t.matrix().transform_point3(p),
            expected.transform_point3(p)
        ));
    }

    #[test]
    fn test_rotate_wraps() {
        let mut t = TransformComponent::new();
        t.rotate(Vec3::new(TAU + 0.5, -PI, 0.0));
        assert!(approx(t.rotation, Vec3::new(0.5, PI, 0.0)));
    }
}
