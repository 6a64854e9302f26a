//! Configuration loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration:
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! title = "swapframe"
//!
//! [renderer]
//! validation = true
//! prefer_mailbox = true
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub window: WindowSettings,
    pub renderer: RendererSettings,
}

/// Initial window parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "swapframe".to_string(),
        }
    }
}

/// Renderer switches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererSettings {
    /// Enable the Khronos validation layer when available.
    /// Defaults to on in debug builds.
    pub validation: bool,
    /// Use MAILBOX presentation when the surface supports it; FIFO otherwise.
    pub prefer_mailbox: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            prefer_mailbox: true,
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text.
    ///
    /// `origin` is only used to label errors.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::ConfigParse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text, path)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Reject values the window system cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Config> {
        Config::from_toml_str(text, Path::new("test.toml"))
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse(
            r#"
            [window]
            width = 1280

            [renderer]
            prefer_mailbox = false
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.title, "swapframe");
        assert!(!config.renderer.prefer_mailbox);
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = parse("[window]\nwidth = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse("[window]\ncolour = 3\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::load_or_default(Path::new("definitely/not/here.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
