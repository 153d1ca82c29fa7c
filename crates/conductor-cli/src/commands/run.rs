//! Run command - execute every suite in conductor.toml

use crate::handlers::CommandHandler;
use crate::reporter::TextReporter;
use anyhow::{Context, Result};
use colored::*;
use conductor_core::{Orchestrator, OrchestratorConfig, RunReport};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the run command
#[derive(Debug, Default)]
pub struct RunArgs {
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Output the report as JSON
    pub json: bool,
    /// Show each test and coverage detail
    pub verbose: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Override `max_concurrent_suites`
    pub max_concurrent: Option<usize>,
    /// Keep admitting suites after a critical failure
    pub no_halt: bool,
    /// Never retry failed tests
    pub no_retry: bool,
}

/// Orchestrator settings after CLI flags are applied
pub fn orchestrator_config(
    section: &conductor_config::OrchestratorSection,
    args: &RunArgs,
) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::from_section(section);
    if let Some(max) = args.max_concurrent {
        config.max_concurrent_suites = max;
    }
    if args.no_halt {
        config.halt_on_critical_failure = false;
    }
    if args.no_retry {
        config.retry_failed_tests = false;
    }
    config
}

/// Run the suites and report; returns the report for the exit code
pub fn run(args: RunArgs) -> Result<RunReport> {
    if args.no_color {
        colored::control::set_override(false);
    }

    let loaded = super::load_config(args.config.as_deref())?;
    let registry = super::load_registry(&loaded)?;
    let handlers = CommandHandler::new(Some(super::working_dir(&loaded)?)).registry();
    let config = orchestrator_config(&loaded.project.orchestrator, &args);

    let reporter = Arc::new(TextReporter::new(args.verbose));
    let mut orchestrator = Orchestrator::new(config, handlers);
    if !args.json {
        orchestrator = orchestrator.with_hook(reporter.clone());
        if registry.is_empty() {
            println!("{}", "No suites configured.".yellow());
        } else {
            println!(
                "Running {} suite{} ({} tests)",
                registry.len().to_string().bold(),
                if registry.len() == 1 { "" } else { "s" },
                registry.test_count()
            );
            println!();
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(orchestrator.run_all(&registry))?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        reporter.report(&report);
    }

    if args.no_color {
        colored::control::unset_override();
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_config::OrchestratorSection;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_flags_override_config() {
        let section = OrchestratorSection {
            max_concurrent_suites: Some(4),
            halt_on_critical_failure: Some(true),
            ..Default::default()
        };
        let args = RunArgs {
            max_concurrent: Some(1),
            no_halt: true,
            no_retry: true,
            ..Default::default()
        };

        let config = orchestrator_config(&section, &args);
        assert_eq!(config.max_concurrent_suites, 1);
        assert!(!config.halt_on_critical_failure);
        assert!(!config.retry_failed_tests);
    }

    #[test]
    fn test_section_kept_without_flags() {
        let section = OrchestratorSection {
            max_concurrent_suites: Some(4),
            ..Default::default()
        };
        let config = orchestrator_config(&section, &RunArgs::default());
        assert_eq!(config.max_concurrent_suites, 4);
        assert!(config.halt_on_critical_failure);
    }

    #[test]
    fn test_run_passing_project() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conductor.toml");
        fs::write(
            &path,
            r#"
[[suite]]
id = "smoke"

[[suite.test]]
id = "ok"
kind = "performance"
config = { command = ["true"] }
"#,
        )
        .unwrap();

        let report = run(RunArgs {
            config: Some(path),
            json: true,
            ..Default::default()
        })
        .unwrap();

        assert!(report.passed());
        assert_eq!(report.summary.passed_tests, 1);
    }
}
