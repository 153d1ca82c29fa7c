//! Conductor Configuration System
//!
//! Provides configuration management for conductor runs:
//! - Run configuration and suite graph (conductor.toml)
//! - Environment variable overrides (CONDUCTOR_*)
//! - Configuration precedence
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project config (./conductor.toml, searched upwards)
//! 3. Environment variables (CONDUCTOR_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use conductor_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "conductor.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid environment override {var}={value}: {reason}")]
    InvalidEnvOverride {
        var: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use project::{OrchestratorSection, ProjectConfig, SuiteSpec, TestSpec};
