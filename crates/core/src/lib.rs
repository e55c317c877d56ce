//! Core utilities shared by every Vesper crate.
//!
//! - Error types and result aliases
//! - Logging initialization
//! - The engine clock
//! - TOML configuration

mod config;
mod error;
mod logging;
mod timer;

pub use config::{Config, GraphicsConfig, PresentModePreference, SceneConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::Timer;
