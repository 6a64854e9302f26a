//! Scene data for the demo.
//!
//! - [`ModelArena`]: models addressed by [`ModelId`]
//! - [`Scene`]: game objects with a colour, a transform and an optional model
//! - [`Sierpinski`]: a lazy vertex generator for the Sierpinski gasket

pub mod arena;
pub mod error;
pub mod game_object;
pub mod model;
pub mod sierpinski;
pub mod transform;

pub use arena::{ModelArena, ModelId};
pub use error::{SceneError, SceneResult};
pub use game_object::{GameObject, GameObjectId, Scene};
pub use model::{Model, Vertex2D};
pub use sierpinski::{Sierpinski, SierpinskiVertices};
pub use transform::TransformComponent;
