//! CPU-side vertex data.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::error::{SceneError, SceneResult};

/// A 2D vertex with a per-vertex colour.
///
/// `#[repr(C)]` and `Pod` so a slice can be copied into a vertex buffer as
/// raw bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex2D {
    pub fn new(position: Vec2, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }
}

/// A named, non-empty vertex list drawn as a triangle list.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    name: String,
    vertices: Vec<Vertex2D>,
}

impl Model {
    /// # Errors
    ///
    /// [`SceneError::EmptyModel`] when `vertices` yields nothing.
    pub fn new(
        name: impl Into<String>,
        vertices: impl IntoIterator<Item = Vertex2D>,
    ) -> SceneResult<Self> {
        let name = name.into();
        let vertices: Vec<Vertex2D> = vertices.into_iter().collect();
        if vertices.is_empty() {
            return Err(SceneError::EmptyModel(name));
        }
        Ok(Self { name, vertices })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex2D] {
        &self.vertices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex data as bytes, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex2D>(), 20);
    }

    #[test]
    fn test_empty_model_rejected() {
        assert_eq!(
            Model::new("nothing", Vec::new()),
            Err(SceneError::EmptyModel("nothing".to_string()))
        );
    }

    #[test]
    fn test_as_bytes() {
        let model = Model::new(
            "point",
            [Vertex2D::new(Vec2::new(1.0, 2.0), Vec3::new(0.0, 0.5, 1.0))],
        )
        .unwrap();
        assert_eq!(model.as_bytes().len(), 20);
        assert_eq!(model.vertices()[0].position(), Vec2::new(1.0, 2.0));
    }
}
