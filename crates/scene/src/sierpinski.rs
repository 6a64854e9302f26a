//! Sierpinski triangle vertex generator.
//!
//! The triangle's base runs from `origin` to `origin + (edge, 0)` and its
//! apex sits at `y - edge * sin(60°)`, which points up in Vulkan clip space.
//! Each subdivision replaces a triangle with three half-size copies: bottom
//! left, bottom right, then top. Leaf triangles are emitted in that
//! depth-first order, corners ordered left, apex, right and coloured red,
//! green, blue.
//!
//! ```
//! use glam::Vec2;
//! use swapframe_scene::Sierpinski;
//!
//! let gasket = Sierpinski::new(Vec2::new(-1.0, 1.0), 2.0, 4)?;
//! assert_eq!(gasket.triangle_count(), 81);
//! assert_eq!(gasket.vertices().count(), 243);
//! # Ok::<(), swapframe_scene::SceneError>(())
//! ```

use std::iter::FusedIterator;

use glam::{Vec2, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::model::Vertex2D;

const LEFT_COLOR: Vec3 = Vec3::new(1.0, 0.0, 0.0);
const APEX_COLOR: Vec3 = Vec3::new(0.0, 1.0, 0.0);
const RIGHT_COLOR: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// Parameters of a Sierpinski gasket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sierpinski {
    origin: Vec2,
    edge: f32,
    depth: u32,
}

impl Sierpinski {
    /// Deepest subdivision whose vertex count, `3^(depth + 1)`, fits in
    /// `usize`.
    pub const MAX_DEPTH: u32 = usize::MAX.ilog(3) - 1;

    /// `depth` is the number of subdivisions; `0` is a single triangle.
    ///
    /// # Errors
    ///
    /// [`SceneError::DepthTooLarge`] above [`MAX_DEPTH`](Self::MAX_DEPTH).
    pub fn new(origin: Vec2, edge: f32, depth: u32) -> SceneResult<Self> {
        if depth > Self::MAX_DEPTH {
            return Err(SceneError::DepthTooLarge {
                depth,
                max: Self::MAX_DEPTH,
            });
        }
        Ok(Self {
            origin,
            edge,
            depth,
        })
    }

    #[inline]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn edge(&self) -> f32 {
        self.edge
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// `3^depth`.
    pub fn triangle_count(&self) -> usize {
        3usize.pow(self.depth)
    }

    pub fn vertex_count(&self) -> usize {
        self.triangle_count() * 3
    }

    /// A fresh iterator over all leaf vertices.
    pub fn vertices(&self) -> SierpinskiVertices {
        SierpinskiVertices::new(*self)
    }
}

impl IntoIterator for Sierpinski {
    type Item = Vertex2D;
    type IntoIter = SierpinskiVertices;

    fn into_iter(self) -> Self::IntoIter {
        SierpinskiVertices::new(self)
    }
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    origin: Vec2,
    edge: f32,
    depth: u32,
}

/// Lazy depth-first walk over the gasket's leaf triangles.
///
/// Memory is bounded by the subdivision depth, not the vertex count.
#[derive(Clone, Debug)]
pub struct SierpinskiVertices {
    stack: Vec<Pending>,
    triangle: [Vertex2D; 3],
    corner: usize,
    remaining: usize,
}

impl SierpinskiVertices {
    fn new(params: Sierpinski) -> Self {
        let mut stack = Vec::with_capacity(2 * params.depth as usize + 1);
        stack.push(Pending {
            origin: params.origin,
            edge: params.edge,
            depth: params.depth,
        });
        Self {
            stack,
            triangle: [Vertex2D::default(); 3],
            corner: 3,
            remaining: params.vertex_count(),
        }
    }

    /// Descends until the next leaf triangle is loaded.
    fn load_next_triangle(&mut self) -> bool {
        while let Some(next) = self.stack.pop() {
            let Pending { origin, edge, depth } = next;
            let height = edge * std::f32::consts::FRAC_PI_3.sin();

            if depth == 0 {
                self.triangle = [
                    Vertex2D::new(origin, LEFT_COLOR),
                    Vertex2D::new(Vec2::new(origin.x + edge / 2.0, origin.y - height), APEX_COLOR),
                    Vertex2D::new(Vec2::new(origin.x + edge, origin.y), RIGHT_COLOR),
                ];
                self.corner = 0;
                return true;
            }

            let half = edge / 2.0;
            let children = [
                origin,
                Vec2::new(origin.x + half, origin.y),
                Vec2::new(origin.x + edge / 4.0, origin.y - height / 2.0),
            ];
            // Reversed so the first child is popped first.
            for child in children.into_iter().rev() {
                self.stack.push(Pending {
                    origin: child,
                    edge: half,
                    depth: depth - 1,
                });
            }
        }
        false
    }
}

impl Iterator for SierpinskiVertices {
    type Item = Vertex2D;

    fn next(&mut self) -> Option<Vertex2D> {
        if self.corner == 3 && !self.load_next_triangle() {
            return None;
        }
        let vertex = self.triangle[self.corner];
        self.corner += 1;
        self.remaining -= 1;
        Some(vertex)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SierpinskiVertices {}

impl FusedIterator for SierpinskiVertices {}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < EPSILON
    }

    #[test]
    fn test_depth_zero_is_one_triangle() {
        let s = Sierpinski::new(Vec2::ZERO, 2.0, 0).unwrap();
        let v: Vec<_> = s.vertices().collect();
        let h = 2.0 * std::f32::consts::FRAC_PI_3.sin();

        assert_eq!(v.len(), 3);
        assert!(approx(v[0].position(), Vec2::new(0.0, 0.0)));
        assert!(approx(v[1].position(), Vec2::new(1.0, -h)));
        assert!(approx(v[2].position(), Vec2::new(2.0, 0.0)));
        assert_eq!(v[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(v[1].color, [0.0, 1.0, 0.0]);
        assert_eq!(v[2].color, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_counts() {
        for depth in 0..6 {
            let s = Sierpinski::new(Vec2::ZERO, 1.0, depth).unwrap();
            assert_eq!(s.vertices().count(), s.vertex_count());
            assert_eq!(s.vertex_count(), 3 * 3usize.pow(depth));
        }
    }

    #[test]
    fn test_first_subdivision_order() {
        let s = Sierpinski::new(Vec2::ZERO, 4.0, 1).unwrap();
        let v: Vec<_> = s.into_iter().collect();
        let h = 4.0 * std::f32::consts::FRAC_PI_3.sin();

        // Bottom left, bottom right, top.
        assert!(approx(v[0].position(), Vec2::new(0.0, 0.0)));
        assert!(approx(v[3].position(), Vec2::new(2.0, 0.0)));
        assert!(approx(v[6].position(), Vec2::new(1.0, -h / 2.0)));
    }

    #[test]
    fn test_exact_size_tracks_progress() {
        let mut it = Sierpinski::new(Vec2::ZERO, 1.0, 2).unwrap().vertices();
        assert_eq!(it.len(), 27);
        it.next();
        it.next();
        assert_eq!(it.len(), 25);
        assert_eq!(it.by_ref().count(), 25);
        assert_eq!(it.next(), None);
        assert_eq!(it.len(), 0);
    }

    #[test]
    fn test_restartable_and_clone() {
        let s = Sierpinski::new(Vec2::new(-1.0, 1.0), 2.0, 3).unwrap();
        let first: Vec<_> = s.vertices().collect();
        let second: Vec<_> = s.vertices().collect();
        assert_eq!(first, second);

        let mut it = s.vertices();
        it.nth(10);
        let forked: Vec<_> = it.clone().collect();
        assert_eq!(forked, it.collect::<Vec<_>>());
        assert_eq!(forked, first[11..]);
    }

    #[test]
    fn test_vertices_stay_inside_outer_triangle() {
        let s = Sierpinski::new(Vec2::new(-1.0, 1.0), 2.0, 4).unwrap();
        let h = 2.0 * std::f32::consts::FRAC_PI_3.sin();
        for v in s.vertices() {
            let p = v.position();
            assert!(p.x >= -1.0 - EPSILON && p.x <= 1.0 + EPSILON);
            assert!(p.y <= 1.0 + EPSILON && p.y >= 1.0 - h - EPSILON);
        }
    }

    #[test]
    fn test_depth_limit() {
        let max = Sierpinski::MAX_DEPTH;
        let deepest = Sierpinski::new(Vec2::ZERO, 1.0, max).unwrap();
        assert_eq!(deepest.vertex_count(), 3 * 3usize.pow(max));

        for depth in [max + 1, 41, u32::MAX] {
            assert_eq!(
                Sierpinski::new(Vec2::ZERO, 1.0, depth),
                Err(SceneError::DepthTooLarge { depth, max })
            );
        }
    }
}
