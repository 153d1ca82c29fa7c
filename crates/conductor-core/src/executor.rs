//! Test executor - runs one test with a timeout and bounded retries
//!
//! Each attempt spawns the handler on the runtime and races it against the
//! test's timeout. A handler that loses the race is detached rather than
//! aborted; it may run on in the background, but its result is discarded.

use crate::error::OrchestratorResult;
use crate::handler::{HandlerOutput, HandlerRegistry, TestHandler};
use crate::model::TestDefinition;
use crate::result::TestExecutionResult;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Timeout and retry policy applied to every test
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPolicy {
    /// Timeout for tests that don't declare one
    pub default_timeout: Duration,
    /// Retries for tests that don't declare them
    pub default_retries: u32,
    /// Pause between attempts
    pub retry_backoff: Duration,
    /// When false, no test is retried
    pub retry_failed_tests: bool,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            default_retries: 2,
            retry_backoff: Duration::from_secs(1),
            retry_failed_tests: true,
        }
    }
}

impl ExecutionPolicy {
    /// Effective timeout for a test
    pub fn timeout_for(&self, test: &TestDefinition) -> Duration {
        test.timeout.unwrap_or(self.default_timeout)
    }

    /// Effective retry count for a test
    pub fn retries_for(&self, test: &TestDefinition) -> u32 {
        if self.retry_failed_tests {
            test.retries.unwrap_or(self.default_retries)
        } else {
            0
        }
    }
}

/// Outcome of a single attempt
#[derive(Debug)]
struct Attempt {
    passed: bool,
    score: f64,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Attempt {
    fn failed(error: String) -> Self {
        Self {
            passed: false,
            score: 0.0,
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    fn from_output(output: HandlerOutput) -> Self {
        let passed = output.outcome.passed();
        let score = output.score.unwrap_or(if passed { 100.0 } else { 0.0 });

        if passed {
            // Errors on a passing outcome are demoted so `errors` stays empty
            let mut warnings = output.warnings;
            warnings.extend(output.errors);
            return Self {
                passed,
                score,
                errors: Vec::new(),
                warnings,
            };
        }

        let errors = if !output.errors.is_empty() {
            output.errors
        } else {
            let failed_keys = output.outcome.failed_keys();
            if failed_keys.is_empty() {
                vec!["handler reported failure".to_string()]
            } else {
                vec![format!("failed entries: {}", failed_keys.join(", "))]
            }
        };

        Self {
            passed,
            score,
            errors,
            warnings: output.warnings,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs single tests against their kind's handler
#[derive(Debug, Clone)]
pub struct TestExecutor {
    handlers: HandlerRegistry,
    policy: ExecutionPolicy,
}

impl TestExecutor {
    pub fn new(handlers: HandlerRegistry, policy: ExecutionPolicy) -> Self {
        Self { handlers, policy }
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Execute one test
    ///
    /// Returns `Err` only when no handler is bound to the test's kind, before
    /// any attempt is made. Every other failure ends up in the result.
    pub async fn execute(&self, test: &TestDefinition) -> OrchestratorResult<TestExecutionResult> {
        let handler = self.handlers.resolve(test.kind)?;
        let timeout = self.policy.timeout_for(test);
        let retries = self.policy.retries_for(test);
        let start = Instant::now();
        let mut attempt_no: u32 = 0;

        loop {
            debug!(test = %test.id, kind = %test.kind, attempt = attempt_no + 1, "running test");
            let attempt = Self::attempt(&handler, test, timeout).await;

            if attempt.passed || attempt_no >= retries {
                if !attempt.passed {
                    debug!(test = %test.id, retries = attempt_no, "test failed");
                }
                return Ok(TestExecutionResult {
                    test_id: test.id.clone(),
                    passed: attempt.passed,
                    score: attempt.score,
                    duration: start.elapsed(),
                    errors: attempt.errors,
                    warnings: attempt.warnings,
                    retry_count: attempt_no,
                });
            }

            warn!(
                test = %test.id,
                attempt = attempt_no + 1,
                max_attempts = retries + 1,
                error = attempt.errors.first().map(String::as_str).unwrap_or(""),
                "test attempt failed, retrying"
            );
            tokio::time::sleep(self.policy.retry_backoff).await;
            attempt_no += 1;
        }
    }

    async fn attempt(
        handler: &Arc<dyn TestHandler>,
        test: &TestDefinition,
        timeout: Duration,
    ) -> Attempt {
        let handler = Arc::clone(handler);
        let definition = test.clone();
        let task = tokio::spawn(async move { handler.execute(&definition).await });

        match tokio::time::timeout(timeout, task).await {
            Err(_) => {
                warn!(test = %test.id, timeout_ms = timeout.as_millis() as u64, "test timed out");
                Attempt::failed(format!("timeout after {}ms", timeout.as_millis()))
            }
            Ok(Err(join_error)) => {
                let message = if join_error.is_panic() {
                    format!("handler panicked: {}", panic_message(join_error.into_panic()))
                } else {
                    "handler task was cancelled".to_string()
                };
                Attempt::failed(message)
            }
            Ok(Ok(Err(error))) => Attempt::failed(error.message),
            Ok(Ok(Ok(output))) => Attempt::from_output(output),
        }
    }
}
