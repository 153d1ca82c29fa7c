//! Aggregation of suite results into a run report

use crate::coverage;
use crate::result::{GlobalSummary, RunReport, SuiteResult, SuiteStatus};
use std::time::Duration;

/// Fold suite results into a [`RunReport`]
///
/// `results` must already be in resolved order; the report keeps that order.
/// `not_run` lists suites that were never admitted. `halted` is set when a
/// critical failure stopped admission, even if nothing was left to skip.
pub fn aggregate(
    results: Vec<SuiteResult>,
    execution_time: Duration,
    not_run: Vec<String>,
    halted: bool,
) -> RunReport {
    let summary = summarize(&results, execution_time, not_run.len());
    let coverages: Vec<_> = results.iter().map(|r| &r.coverage).collect();
    let coverage = coverage::merge(&coverages);

    RunReport {
        halted,
        suite_results: results,
        summary,
        coverage,
        not_run,
    }
}

fn summarize(results: &[SuiteResult], execution_time: Duration, skipped: usize) -> GlobalSummary {
    let total_suites = results.len();
    let passed_suites = results.iter().filter(|r| r.passed).count();
    let failed_suites = total_suites - passed_suites;

    let total_tests = results.iter().map(|r| r.summary.total_tests).sum::<usize>();
    let passed_tests = results.iter().map(|r| r.summary.passed_tests).sum::<usize>();
    let failed_tests = results.iter().map(|r| r.summary.failed_tests).sum::<usize>();
    let critical_failures = results.iter().map(|r| r.summary.critical_failures).sum::<usize>();

    // Empty suites count with score 0
    let overall_score = if total_suites == 0 {
        0.0
    } else {
        results.iter().map(|r| r.score).sum::<f64>() / total_suites as f64
    };

    GlobalSummary {
        total_suites,
        passed_suites,
        failed_suites,
        skipped_suites: skipped,
        total_tests,
        passed_tests,
        failed_tests,
        overall_score,
        critical_failures,
        status: SuiteStatus::from_counts(critical_failures, failed_suites),
        execution_time,
    }
}
