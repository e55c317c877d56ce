//! Engine configuration loaded from a TOML file.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [window]
//! title = "Vesper"
//! width = 1280
//! height = 720
//!
//! [graphics]
//! present_mode = "mailbox"
//! validation = true
//!
//! [scene]
//! demo_lights = true
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub scene: SceneConfig,
}

/// Window settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vesper".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Present mode the swapchain should try first.
///
/// FIFO is always available, so it is both a valid preference and the
/// fallback for any other choice.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresentModePreference {
    #[default]
    Fifo,
    Mailbox,
}

/// Graphics settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphicsConfig {
    pub present_mode: PresentModePreference,
    pub validation: bool,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            present_mode: PresentModePreference::Fifo,
            validation: cfg!(debug_assertions),
        }
    }
}

/// Scene settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Append the built-in directional + orbiting point light to every render list.
    pub demo_lights: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self { demo_lights: true }
    }
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults. A file that exists but does not
    /// parse is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {:?} not found, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config = toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| Error::ConfigParse {
            path: "<string>".into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.graphics.present_mode, PresentModePreference::Fifo);
        assert!(config.scene.demo_lights);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            r#"
            [window]
            width = 800

            [graphics]
            present_mode = "mailbox"

            [scene]
            demo_lights = false
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.graphics.present_mode, PresentModePreference::Mailbox);
        assert!(!config.scene.demo_lights);
    }

    #[test]
    fn test_unknown_present_mode_is_rejected() {
        let result = Config::from_toml_str("[graphics]\npresent_mode = \"immediate\"\n");
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load("/definitely/not/here/vesper.toml").unwrap();
        assert_eq!(config, Config::default());
    }
}
