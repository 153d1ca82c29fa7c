//! Process-backed test handler
//!
//! Every test kind is run by spawning the command in the test's
//! `config.command`. A string is run through `sh -c`; an array is run
//! directly. The exit status decides pass/fail unless stdout is a JSON
//! report, which takes precedence.

use async_trait::async_trait;
use conductor_core::{HandlerError, HandlerOutput, HandlerRegistry, TestDefinition, TestHandler};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Report a test command may print on stdout
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcessReport {
    #[serde(default)]
    passed: Option<bool>,
    /// Keyed results, e.g. one per modality
    #[serde(default)]
    results: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    errors: Vec<String>,
}

impl ProcessReport {
    fn into_output(self, exit_ok: bool) -> HandlerOutput {
        let mut output = match self.results {
            Some(results) => HandlerOutput::batch(results),
            None => HandlerOutput::single(self.passed.unwrap_or(exit_ok)),
        };
        output.score = self.score;
        output.warnings = self.warnings;
        output.errors = self.errors;
        output
    }
}

/// Runs a test's configured command as a child process
#[derive(Debug, Clone, Default)]
pub struct CommandHandler {
    /// Working directory for spawned commands
    working_dir: Option<PathBuf>,
}

impl CommandHandler {
    pub fn new(working_dir: Option<PathBuf>) -> Self {
        Self { working_dir }
    }

    /// Registry with this handler bound to every kind
    pub fn registry(self) -> HandlerRegistry {
        HandlerRegistry::new().with_all(Arc::new(self))
    }

    fn command_for(test: &TestDefinition) -> Result<Command, HandlerError> {
        let missing = || HandlerError::new(format!("test '{}' has no command configured", test.id));
        let value = test
            .config
            .as_ref()
            .and_then(|config| config.get("command"))
            .ok_or_else(missing)?;

        let command = match value {
            serde_json::Value::String(script) if !script.trim().is_empty() => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(script);
                command
            }
            serde_json::Value::Array(parts) => {
                let argv: Vec<&str> = parts.iter().filter_map(|p| p.as_str()).collect();
                if argv.len() != parts.len() {
                    return Err(HandlerError::new(format!(
                        "test '{}' command must be an array of strings",
                        test.id
                    )));
                }
                let Some((program, args)) = argv.split_first() else {
                    return Err(missing());
                };
                let mut command = Command::new(program);
                command.args(args);
                command
            }
            _ => return Err(missing()),
        };
        Ok(command)
    }
}

#[async_trait]
impl TestHandler for CommandHandler {
    async fn execute(&self, test: &TestDefinition) -> Result<HandlerOutput, HandlerError> {
        let mut command = Self::command_for(test)?;
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
            .env("CONDUCTOR_TEST_ID", &test.id)
            .env("CONDUCTOR_TEST_KIND", test.kind.as_str())
            .env("CONDUCTOR_TEST_MODALITY", test.modality.as_deref().unwrap_or(""))
            .env("CONDUCTOR_TEST_LEVEL", test.level.as_deref().unwrap_or(""))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output().await.map_err(|e| {
            HandlerError::new(format!("failed to spawn command for '{}': {}", test.id, e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_ok = output.status.success();
        debug!(test = %test.id, status = ?output.status.code(), "command finished");

        if let Ok(report) = serde_json::from_str::<ProcessReport>(stdout.trim()) {
            return Ok(report.into_output(exit_ok));
        }

        if exit_ok {
            return Ok(HandlerOutput::passed());
        }

        let status = match output.status.code() {
            Some(code) => format!("command exited with status {}", code),
            None => "command terminated by signal".to_string(),
        };
        let mut failed = HandlerOutput::failed(status);
        if let Some(line) = stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            failed = failed.with_error(line.trim().to_string());
        }
        Ok(failed)
    }
}
