//! Orchestrator - drives a whole run across the suite graph
//!
//! Suites are admitted in resolved order once every dependency has finished,
//! up to `max_concurrent_suites` at a time. A dependency that finished with
//! failures still unblocks its dependents; only a critical failure with
//! `halt_on_critical_failure` set stops further admission. Suites already in
//! flight when the run halts are allowed to finish.

use crate::aggregate::aggregate;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::executor::{ExecutionPolicy, TestExecutor};
use crate::handler::HandlerRegistry;
use crate::model::TestSuite;
use crate::registry::SuiteRegistry;
use crate::resolver;
use crate::result::{RunReport, SuiteResult};
use crate::runner::SuiteRunner;
use crate::status::{StatusTracker, SuiteState};
use conductor_config::OrchestratorSection;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Run-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Upper bound on suites in flight at once
    pub max_concurrent_suites: usize,
    /// Timeout for tests that don't declare one
    pub test_timeout: Duration,
    pub retry_failed_tests: bool,
    /// Retries for tests that don't declare them
    pub default_retries: u32,
    pub retry_backoff: Duration,
    /// Stop admitting suites after the first critical failure
    pub halt_on_critical_failure: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_suites: 3,
            test_timeout: Duration::from_secs(30),
            retry_failed_tests: true,
            default_retries: 2,
            retry_backoff: Duration::from_secs(1),
            halt_on_critical_failure: true,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overlaid with whatever the section sets
    pub fn from_section(section: &OrchestratorSection) -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_suites: section
                .max_concurrent_suites
                .unwrap_or(defaults.max_concurrent_suites),
            test_timeout: section
                .test_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.test_timeout),
            retry_failed_tests: section
                .retry_failed_tests
                .unwrap_or(defaults.retry_failed_tests),
            default_retries: section.default_retries.unwrap_or(defaults.default_retries),
            retry_backoff: section
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            halt_on_critical_failure: section
                .halt_on_critical_failure
                .unwrap_or(defaults.halt_on_critical_failure),
        }
    }

    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.max_concurrent_suites == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "max_concurrent_suites must be at least 1".to_string(),
            ));
        }
        if self.test_timeout.is_zero() {
            return Err(OrchestratorError::InvalidConfig(
                "test_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-test policy handed to the executor
    pub fn execution_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy {
            default_timeout: self.test_timeout,
            default_retries: self.default_retries,
            retry_backoff: self.retry_backoff,
            retry_failed_tests: self.retry_failed_tests,
        }
    }
}

/// Callbacks fired as a run progresses
///
/// Hooks are called from the orchestrating task, never concurrently.
pub trait ReportHook: Send + Sync {
    fn on_suite_start(&self, _suite: &TestSuite) {}

    fn on_suite_complete(&self, _result: &SuiteResult) {}

    fn on_run_complete(&self, _report: &RunReport) {}
}

/// Runs registered suites to a [`RunReport`]
pub struct Orchestrator {
    config: OrchestratorConfig,
    runner: SuiteRunner,
    status: StatusTracker,
    hooks: Vec<Arc<dyn ReportHook>>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, handlers: HandlerRegistry) -> Self {
        let executor = TestExecutor::new(handlers, config.execution_policy());
        Self {
            config,
            runner: SuiteRunner::new(executor),
            status: StatusTracker::new(),
            hooks: Vec::new(),
        }
    }

    /// Attach a report hook
    pub fn with_hook(mut self, hook: Arc<dyn ReportHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        self.runner.executor().handlers()
    }

    /// State of a suite in the current or last run
    pub fn status(&self, suite_id: &str) -> Option<SuiteState> {
        self.status.get(suite_id)
    }

    /// Handle for watching suite states from another task
    pub fn status_tracker(&self) -> StatusTracker {
        self.status.clone()
    }

    /// Order in which [`run_all`](Self::run_all) would admit the suites
    pub fn resolve_order(&self, registry: &SuiteRegistry) -> OrchestratorResult<Vec<String>> {
        resolver::resolve_order(registry)
    }

    /// Run a single suite, ignoring its dependencies
    ///
    /// The suite's state is tracked the same way as in a full run.
    pub async fn run_suite(&self, suite: &TestSuite) -> OrchestratorResult<SuiteResult> {
        self.config.validate()?;
        self.handlers().ensure_bound(&suite.tests.iter().map(|t| t.kind).collect())?;

        self.status.set(&suite.id, SuiteState::Running);
        let result = self.runner.run_suite(suite).await;
        self.status.set(&suite.id, Self::finished_state(&result));
        Ok(result)
    }

    fn finished_state(result: &SuiteResult) -> SuiteState {
        if result.passed {
            SuiteState::Completed
        } else {
            SuiteState::Failed
        }
    }

    /// Run every suite in the registry
    ///
    /// Configuration problems (cycles, unknown dependencies, unbound kinds)
    /// are reported before any test starts. Once running, test and suite
    /// failures are recorded in the report and never returned as errors.
    pub async fn run_all(&self, registry: &SuiteRegistry) -> OrchestratorResult<RunReport> {
        self.config.validate()?;
        let order = resolver::resolve_order(registry)?;
        self.handlers().ensure_bound(&registry.kinds())?;

        info!(
            suites = order.len(),
            tests = registry.test_count(),
            max_concurrent = self.config.max_concurrent_suites,
            "starting run"
        );
        let start = Instant::now();
        self.status.reset(order.iter().map(String::as_str));

        let mut pending: Vec<&TestSuite> = order.iter().filter_map(|id| registry.get(id)).collect();
        let mut finished: HashSet<&str> = HashSet::new();
        let mut results: HashMap<String, SuiteResult> = HashMap::new();
        let mut in_flight = FuturesUnordered::new();
        let mut halted = false;
        let runner = &self.runner;

        loop {
            if !halted {
                let mut index = 0;
                while in_flight.len() < self.config.max_concurrent_suites && index < pending.len() {
                    let suite = pending[index];
                    let ready = suite
                        .dependencies
                        .iter()
                        .all(|dep| finished.contains(dep.as_str()));
                    if !ready {
                        index += 1;
                        continue;
                    }

                    pending.remove(index);
                    debug!(suite = %suite.id, "admitting suite");
                    self.status.set(&suite.id, SuiteState::Running);
                    for hook in &self.hooks {
                        hook.on_suite_start(suite);
                    }
                    in_flight.push(async move { (suite, runner.run_suite(suite).await) });
                }
            }

            let Some((suite, result)) = in_flight.next().await else {
                break;
            };

            finished.insert(suite.id.as_str());
            self.status.set(&suite.id, Self::finished_state(&result));
            for hook in &self.hooks {
                hook.on_suite_complete(&result);
            }

            let critical = result.summary.critical_failures > 0;
            if critical && !halted && self.config.halt_on_critical_failure {
                halted = true;
                warn!(
                    suite = %suite.id,
                    critical_failures = result.summary.critical_failures,
                    remaining = pending.len(),
                    "critical failure, halting run"
                );
            }
            results.insert(suite.id.clone(), result);
        }

        let not_run: Vec<String> = pending.iter().map(|suite| suite.id.clone()).collect();
        for id in &not_run {
            self.status.set(id, SuiteState::Skipped);
        }

        let ordered: Vec<SuiteResult> = order.iter().filter_map(|id| results.remove(id)).collect();
        let report = aggregate(ordered, start.elapsed(), not_run, halted);

        info!(
            status = %report.summary.status,
            passed_suites = report.summary.passed_suites,
            failed_suites = report.summary.failed_suites,
            skipped_suites = report.summary.skipped_suites,
            score = report.summary.overall_score,
            duration_ms = report.summary.execution_time.as_millis() as u64,
            "run finished"
        );
        for hook in &self.hooks {
            hook.on_run_complete(&report);
        }
        Ok(report)
    }
}
