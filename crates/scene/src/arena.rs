//! Model storage addressed by index handles.
//!
//! Game objects refer to models by [`ModelId`]; the arena is the only owner.
//! Models are reference counted internally so a caller can keep one alive
//! across frames with [`ModelArena::share`] without holding the arena.

use std::sync::Arc;

use tracing::debug;

use crate::error::{SceneError, SceneResult};
use crate::model::Model;

/// Handle to a model in a [`ModelArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u32);

impl ModelId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Append-only model storage.
#[derive(Debug, Default)]
pub struct ModelArena {
    models: Vec<Arc<Model>>,
}

impl ModelArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `model` and returns its handle.
    pub fn insert(&mut self, model: Model) -> ModelId {
        let id = ModelId(self.models.len() as u32);
        debug!(
            "Model '{}' stored as {:?} ({} vertices)",
            model.name(),
            id,
            model.vertex_count()
        );
        self.models.push(Arc::new(model));
        id
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownModel`] if `id` came from another arena.
    pub fn get(&self, id: ModelId) -> SceneResult<&Model> {
        self.models
            .get(id.index())
            .map(|m| m.as_ref())
            .ok_or(SceneError::UnknownModel(id))
    }

    /// A counted reference to the model.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownModel`] if `id` came from another arena.
    pub fn share(&self, id: ModelId) -> SceneResult<Arc<Model>> {
        self.models
            .get(id.index())
            .cloned()
            .ok_or(SceneError::UnknownModel(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &Model)> {
        self.models
            .iter()
            .enumerate()
            .map(|(i, m)| (ModelId(i as u32), m.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vertex2D;

    fn model(name: &str) -> Model {
        Model::new(name, [Vertex2D::default(); 3]).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut arena = ModelArena::new();
        let a = arena.insert(model("a"));
        let b = arena.insert(model("b"));

        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a).unwrap().name(), "a");
        assert_eq!(arena.get(b).unwrap().name(), "b");
    }

    #[test]
    fn test_unknown_id() {
        let mut other = ModelArena::new();
        other.insert(model("x"));
        let foreign = other.insert(model("y"));

        let arena = ModelArena::new();
        assert_eq!(arena.get(foreign), Err(SceneError::UnknownModel(foreign)));
        assert!(arena.share(foreign).is_err());
    }

    #[test]
    fn test_share_outlives_borrow() {
        let mut arena = ModelArena::new();
        let id = arena.insert(model("kept"));
        let shared = arena.share(id).unwrap();
        drop(arena);
        assert_eq!(shared.name(), "kept");
    }

    #[test]
    fn test_iter_in_insertion_order() {
        let mut arena = ModelArena::new();
        arena.insert(model("first"));
        arena.insert(model("second"));
        let names: Vec<_> = arena.iter().map(|(_, m)| m.name().to_string()).collect();
        assert_eq!(names, ["first", "second"]);
    }
}
