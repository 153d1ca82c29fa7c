//! Command implementations

pub mod list;
pub mod order;
pub mod run;

use anyhow::{Context, Result};
use conductor_config::{Config, ConfigLoader};
use conductor_core::SuiteRegistry;
use std::path::{Path, PathBuf};

/// Load conductor.toml from `--config` or by searching upwards from the
/// working directory
pub fn load_config(config: Option<&Path>) -> Result<Config> {
    let loader = ConfigLoader::new();
    match config {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => {
            let cwd = std::env::current_dir()?;
            loader
                .load_from_directory(&cwd)
                .context("failed to load conductor.toml")
        }
    }
}

/// Build the suite registry described by the loaded configuration
pub fn load_registry(config: &Config) -> Result<SuiteRegistry> {
    SuiteRegistry::from_config(&config.project).context("invalid suite configuration")
}

/// Directory test commands run in
pub fn working_dir(config: &Config) -> Result<PathBuf> {
    match config.project_root() {
        Some(root) => Ok(root.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}
