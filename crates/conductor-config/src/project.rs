//! Project Configuration (conductor.toml)
//!
//! Handles the run configuration and the declarative suite graph stored in
//! `conductor.toml`.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Project configuration from conductor.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Orchestrator settings
    #[serde(default)]
    pub orchestrator: OrchestratorSection,

    /// Declared test suites, in registry order
    #[serde(default, rename = "suite")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suites: Vec<SuiteSpec>,
}

/// `[orchestrator]` section
///
/// Every key is optional; unset keys fall back to the orchestrator defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorSection {
    /// Maximum number of suites executing at once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_suites: Option<usize>,

    /// Default per-test timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_timeout_ms: Option<u64>,

    /// Whether failed tests are retried at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_failed_tests: Option<bool>,

    /// Retries for tests that don't declare their own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_retries: Option<u32>,

    /// Pause between attempts in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,

    /// Stop admitting suites after a critical failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halt_on_critical_failure: Option<bool>,
}

/// `[[suite]]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SuiteSpec {
    pub id: String,

    /// Display name (defaults to the id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Run the suite's tests concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Suites that must complete before this one starts
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, rename = "test")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestSpec>,
}

/// `[[suite.test]]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Test kind id (`cross-modal`, `accessibility`, `handoff`, `performance`).
    /// Checked against the known kinds when the registry is built.
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(default)]
    pub critical: bool,

    /// Payload handed to the test-kind handler untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse project configuration from a TOML string
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: Path::new("<inline>").to_path_buf(),
            error: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    ///
    /// Graph-level problems (unknown dependencies, cycles, unknown kinds) are
    /// left to the orchestrator, which reports them with suite context.
    pub fn validate(&self) -> ConfigResult<()> {
        self.orchestrator.validate()?;

        let mut suite_ids = HashSet::new();
        for (index, suite) in self.suites.iter().enumerate() {
            if suite.id.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("suite[{}].id", index),
                    "id cannot be empty",
                ));
            }
            if !suite_ids.insert(suite.id.as_str()) {
                return Err(ConfigError::invalid_value(
                    format!("suite[{}].id", index),
                    format!("duplicate suite id '{}'", suite.id),
                ));
            }

            let mut test_ids = HashSet::new();
            for test in &suite.tests {
                if test.id.trim().is_empty() {
                    return Err(ConfigError::invalid_value(
                        format!("suite.{}.test.id", suite.id),
                        "id cannot be empty",
                    ));
                }
                if !test_ids.insert(test.id.as_str()) {
                    return Err(ConfigError::invalid_value(
                        format!("suite.{}.test.id", suite.id),
                        format!("duplicate test id '{}'", test.id),
                    ));
                }
                if test.timeout_ms == Some(0) {
                    return Err(ConfigError::invalid_value(
                        format!("suite.{}.test.{}.timeout_ms", suite.id, test.id),
                        "timeout must be greater than zero",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Look up a suite spec by id
    pub fn suite(&self, id: &str) -> Option<&SuiteSpec> {
        self.suites.iter().find(|s| s.id == id)
    }
}

impl OrchestratorSection {
    /// Validate the orchestrator settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent_suites == Some(0) {
            return Err(ConfigError::invalid_value(
                "orchestrator.max_concurrent_suites",
                "must be at least 1",
            ));
        }
        if self.test_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value(
                "orchestrator.test_timeout_ms",
                "timeout must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Overlay another section; its set values win
    pub fn merge(&mut self, other: &OrchestratorSection) {
        if other.max_concurrent_suites.is_some() {
            self.max_concurrent_suites = other.max_concurrent_suites;
        }
        if other.test_timeout_ms.is_some() {
            self.test_timeout_ms = other.test_timeout_ms;
        }
        if other.retry_failed_tests.is_some() {
            self.retry_failed_tests = other.retry_failed_tests;
        }
        if other.default_retries.is_some() {
            self.default_retries = other.default_retries;
        }
        if other.retry_backoff_ms.is_some() {
            self.retry_backoff_ms = other.retry_backoff_ms;
        }
        if other.halt_on_critical_failure.is_some() {
            self.halt_on_critical_failure = other.halt_on_critical_failure;
        }
    }
}

impl SuiteSpec {
    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl TestSpec {
    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
