//! Error types shared by the application-facing crates.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for window, configuration and IO failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan-related errors raised outside the renderer (e.g. surface creation)
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or event loop errors
    #[error("Window error: {0}")]
    Window(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A configuration value is out of range
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using the shared Error type.
pub type Result<T> = std::result::Result<T, Error>;
