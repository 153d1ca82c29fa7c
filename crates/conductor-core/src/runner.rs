//! Suite runner - executes the tests of one suite

use crate::coverage;
use crate::error::OrchestratorError;
use crate::executor::TestExecutor;
use crate::model::TestSuite;
use crate::result::{SuiteResult, SuiteStatus, SuiteSummary, TestExecutionResult};
use futures_util::future::join_all;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Runs whole suites through a [`TestExecutor`]
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    executor: TestExecutor,
}

impl SuiteRunner {
    pub fn new(executor: TestExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &TestExecutor {
        &self.executor
    }

    /// Run every test of the suite and summarize
    ///
    /// Parallel suites poll all tests at once; sequential suites run them in
    /// declaration order, one at a time.
    pub async fn run_suite(&self, suite: &TestSuite) -> SuiteResult {
        let start = Instant::now();
        info!(suite = %suite.id, tests = suite.len(), parallel = suite.parallel, "starting suite");

        let (results, fault) = if suite.parallel {
            self.run_parallel(suite).await
        } else {
            self.run_sequential(suite).await
        };

        let result = match fault {
            Some(error) => Self::faulted(suite, results, error, start.elapsed()),
            None => Self::summarize(suite, results, start.elapsed()),
        };

        info!(
            suite = %suite.id,
            status = %result.summary.status,
            passed = result.summary.passed_tests,
            failed = result.summary.failed_tests,
            duration_ms = result.duration.as_millis() as u64,
            "suite finished"
        );
        result
    }

    /// Run tests sequentially
    async fn run_sequential(
        &self,
        suite: &TestSuite,
    ) -> (Vec<TestExecutionResult>, Option<OrchestratorError>) {
        let mut results = Vec::with_capacity(suite.len());
        for test in &suite.tests {
            match self.executor.execute(test).await {
                Ok(result) => results.push(result),
                Err(error) => return (results, Some(error)),
            }
        }
        (results, None)
    }

    /// Run tests concurrently
    async fn run_parallel(
        &self,
        suite: &TestSuite,
    ) -> (Vec<TestExecutionResult>, Option<OrchestratorError>) {
        let outcomes = join_all(suite.tests.iter().map(|test| self.executor.execute(test))).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut fault = None;
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(error) => {
                    fault.get_or_insert(error);
                }
            }
        }
        (results, fault)
    }

    fn summarize(
        suite: &TestSuite,
        results: Vec<TestExecutionResult>,
        duration: Duration,
    ) -> SuiteResult {
        let total_tests = suite.len();
        let passed_tests = results.iter().filter(|r| r.passed).count();
        let failed_tests = results.len() - passed_tests;
        let critical_failures = suite
            .tests
            .iter()
            .zip(&results)
            .filter(|(test, result)| test.critical && !result.passed)
            .count();

        let score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
        };

        let coverage = coverage::suite_coverage(&suite.tests, &results);

        SuiteResult {
            suite_id: suite.id.clone(),
            passed: critical_failures == 0,
            score,
            duration,
            test_results: results,
            coverage,
            summary: SuiteSummary {
                total_tests,
                passed_tests,
                failed_tests,
                skipped_tests: 0,
                critical_failures,
                average_score: score,
                status: SuiteStatus::from_counts(critical_failures, failed_tests),
            },
            fault: None,
        }
    }

    /// Hard failure for a suite that faulted outside any single test
    fn faulted(
        suite: &TestSuite,
        results: Vec<TestExecutionResult>,
        error: OrchestratorError,
        duration: Duration,
    ) -> SuiteResult {
        warn!(suite = %suite.id, error = %error, "suite faulted");

        let total_tests = suite.len();
        let passed_tests = results.iter().filter(|r| r.passed).count();
        let failed_tests = results.len() - passed_tests;
        let coverage = coverage::suite_coverage(&suite.tests, &results);

        SuiteResult {
            suite_id: suite.id.clone(),
            passed: false,
            score: 0.0,
            duration,
            coverage,
            summary: SuiteSummary {
                total_tests,
                passed_tests,
                failed_tests,
                skipped_tests: total_tests - results.len(),
                critical_failures: total_tests,
                average_score: 0.0,
                status: SuiteStatus::Fail,
            },
            test_results: results,
            fault: Some(error.to_string()),
        }
    }
}
