//! Configuration Loader
//!
//! Handles loading configuration and applying overrides with proper precedence.

use crate::project::{OrchestratorSection, ProjectConfig};
use crate::{ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding `max_concurrent_suites`
pub const ENV_MAX_CONCURRENT_SUITES: &str = "CONDUCTOR_MAX_CONCURRENT_SUITES";
/// Environment variable overriding `test_timeout_ms`
pub const ENV_TEST_TIMEOUT_MS: &str = "CONDUCTOR_TEST_TIMEOUT_MS";
/// Environment variable overriding `retry_failed_tests`
pub const ENV_RETRY_FAILED_TESTS: &str = "CONDUCTOR_RETRY_FAILED_TESTS";
/// Environment variable overriding `halt_on_critical_failure`
pub const ENV_HALT_ON_CRITICAL_FAILURE: &str = "CONDUCTOR_HALT_ON_CRITICAL_FAILURE";

/// Configuration loader
///
/// Loads configuration and applies overrides with the following precedence:
/// 1. Project config (conductor.toml) - lowest priority
/// 2. Environment variables (CONDUCTOR_*) - overrides project
/// 3. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment overrides (used by tests and embedders)
    ignore_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration with overrides applied
    pub project: ProjectConfig,

    /// File the configuration came from, if any
    pub source: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Disable environment variable overrides
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find conductor.toml. Without one,
    /// an empty default configuration is returned.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (source, project) = match Self::find_config_file(start_dir) {
            Some(path) => {
                let project = ProjectConfig::load_from_file(&path)?;
                (Some(path), project)
            }
            None => (None, ProjectConfig::default()),
        };

        self.finish(project, source)
    }

    /// Load configuration from a specific config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project = ProjectConfig::load_from_file(config_path)?;
        self.finish(project, Some(config_path.to_path_buf()))
    }

    fn finish(&self, mut project: ProjectConfig, source: Option<PathBuf>) -> ConfigResult<Config> {
        if !self.ignore_env {
            apply_overrides(&mut project.orchestrator, |var| env::var(var).ok())?;
            project.orchestrator.validate()?;
        }
        Ok(Config { project, source })
    }

    /// Find conductor.toml by walking up the directory tree
    pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return None,
            }
        }
    }
}

impl Config {
    /// Directory containing the config file
    pub fn project_root(&self) -> Option<&Path> {
        self.source.as_deref().and_then(Path::parent)
    }

    /// Check whether a config file was found
    pub fn is_project(&self) -> bool {
        self.source.is_some()
    }
}

/// Apply CONDUCTOR_* overrides read through `lookup`
pub fn apply_overrides<F>(section: &mut OrchestratorSection, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_MAX_CONCURRENT_SUITES) {
        section.max_concurrent_suites = Some(parse_number(ENV_MAX_CONCURRENT_SUITES, &value)?);
    }

    if let Some(value) = lookup(ENV_TEST_TIMEOUT_MS) {
        section.test_timeout_ms = Some(parse_number(ENV_TEST_TIMEOUT_MS, &value)?);
    }

    if let Some(value) = lookup(ENV_RETRY_FAILED_TESTS) {
        section.retry_failed_tests = Some(parse_bool(ENV_RETRY_FAILED_TESTS, &value)?);
    }

    if let Some(value) = lookup(ENV_HALT_ON_CRITICAL_FAILURE) {
        section.halt_on_critical_failure = Some(parse_bool(ENV_HALT_ON_CRITICAL_FAILURE, &value)?);
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(var: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride {
            var: var.to_string(),
            value: value.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
}

fn parse_bool(var: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            var: var.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
