//! Game objects and the scene that owns them.

use glam::Vec3;

use crate::arena::{ModelArena, ModelId};
use crate::error::SceneResult;
use crate::model::Model;
use crate::transform::TransformComponent;

/// Identifier unique within one [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObjectId(u32);

impl GameObjectId {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameObject {
    id: GameObjectId,
    pub model: Option<ModelId>,
    pub color: Vec3,
    pub transform: TransformComponent,
}

impl GameObject {
    #[inline]
    pub fn id(&self) -> GameObjectId {
        self.id
    }
}

/// Models plus the objects that reference them.
///
/// Ids are issued per scene, so two scenes may hand out the same id.
#[derive(Debug, Default)]
pub struct Scene {
    models: ModelArena,
    objects: Vec<GameObject>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, model: Model) -> ModelId {
        self.models.insert(model)
    }

    /// Creates an object with an identity transform and white colour.
    pub fn spawn(&mut self, model: Option<ModelId>) -> &mut GameObject {
        let id = GameObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(GameObject {
            id,
            model,
            color: Vec3::ONE,
            transform: TransformComponent::default(),
        });
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    pub fn object(&self, id: GameObjectId) -> Option<&GameObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: GameObjectId) -> Option<&mut GameObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [GameObject] {
        &mut self.objects
    }

    pub fn models(&self) -> &ModelArena {
        &self.models
    }

    /// The model an object draws, if it has one.
    ///
    /// # Errors
    ///
    /// Fails if the object's model id is not from this scene's arena.
    pub fn model_of(&self, object: &GameObject) -> SceneResult<Option<&Model>> {
        object.model.map(|id| self.models.get(id)).transpose()
    }

    /// Total vertices across all objects with a model.
    pub fn vertex_count(&self) -> SceneResult<usize> {
        let mut total = 0;
        for object in &self.objects {
            if let Some(model) = self.model_of(object)? {
                total += model.vertex_count();
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vertex2D;

    fn triangle() -> Model {
        Model::new("triangle", [Vertex2D::default(); 3]).unwrap()
    }

    #[test]
    fn test_ids_are_unique() {
        let mut scene = Scene::new();
        let a = scene.spawn(None).id();
        let b = scene.spawn(None).id();
        assert_ne!(a, b);
        assert_eq!(scene.objects().len(), 2);
    }

    #[test]
    fn test_ids_are_per_scene() {
        let mut first = Scene::new();
        let mut second = Scene::new();
        assert_eq!(first.spawn(None).id(), second.spawn(None).id());
    }

    #[test]
    fn test_spawn_defaults() {
        let mut scene = Scene::new();
        let object = scene.spawn(None);
        assert_eq!(object.color, Vec3::ONE);
        assert_eq!(object.transform, TransformComponent::default());
    }

    #[test]
    fn test_model_lookup() {
        let mut scene = Scene::new();
        let model = scene.add_model(triangle());
        let id = scene.spawn(Some(model)).id();
        scene.spawn(None);

        let object = scene.object(id).unwrap();
        assert_eq!(scene.model_of(object).unwrap().unwrap().name(), "triangle");
        assert_eq!(scene.vertex_count().unwrap(), 3);
    }

    #[test]
    fn test_foreign_model_id_errors() {
        let mut other = Scene::new();
        other.add_model(triangle());
        let foreign = other.add_model(triangle());

        let mut scene = Scene::new();
        scene.spawn(Some(foreign));
        assert!(scene.vertex_count().is_err());
    }

    #[test]
    fn test_object_mut() {
        let mut scene = Scene::new();
        let id = scene.spawn(None).id();
        scene.object_mut(id).unwrap().color = Vec3::new(0.1, 0.8, 0.1);
        assert_eq!(scene.object(id).unwrap().color, Vec3::new(0.1, 0.8, 0.1));
    }
}
