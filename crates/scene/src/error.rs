//! Scene errors.

use thiserror::Error;

use crate::arena::ModelId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The id was not issued by this arena.
    #[error("Unknown model {0:?}")]
    UnknownModel(ModelId),

    /// A model needs at least one vertex.
    #[error("Model '{0}' has no vertices")]
    EmptyModel(String),

    /// The gasket's vertex count would not fit in `usize`.
    #[error("Sierpinski depth {depth} exceeds the maximum of {max}")]
    DepthTooLarge { depth: u32, max: u32 },
}

pub type SceneResult<T> = std::result::Result<T, SceneError>;
