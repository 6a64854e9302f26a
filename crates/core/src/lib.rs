//! Shared foundations for the swapframe crates.
//!
//! - Error type and result alias
//! - Logging initialization
//! - Frame timing
//! - TOML configuration

pub mod config;

mod error;
mod logging;
mod timer;

pub use config::{Config, RendererSettings, WindowSettings};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::Timer;
