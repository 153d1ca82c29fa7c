//! Run reporter - display suite and run results

use colored::*;
use conductor_core::{ReportHook, RunReport, SuiteResult, SuiteStatus, TestSuite};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Text reporter with output configuration
///
/// Registered as a [`ReportHook`] it prints one line per suite as suites
/// finish; [`report`](Self::report) prints the closing summary.
pub struct TextReporter {
    /// Show each test under its suite
    verbose: bool,
}

impl TextReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print the run summary, failures and coverage
    pub fn report(&self, report: &RunReport) {
        println!();
        self.print_summary(report);
        self.print_failures(report);
        self.print_coverage(report);
    }

    fn status_label(status: SuiteStatus) -> ColoredString {
        match status {
            SuiteStatus::Pass => "PASS".green().bold(),
            SuiteStatus::Warning => "WARN".yellow().bold(),
            SuiteStatus::Fail => "FAIL".red().bold(),
        }
    }

    fn print_suite(&self, result: &SuiteResult) {
        let summary = &result.summary;
        println!(
            "{} {} ({}/{} passed, score {:.1}, {:.2?})",
            Self::status_label(summary.status),
            result.suite_id.bold(),
            summary.passed_tests,
            summary.total_tests,
            result.score,
            result.duration
        );

        if self.verbose {
            for test in &result.test_results {
                let mark = if test.passed { "✓".green() } else { "✗".red() };
                let retries = if test.retry_count > 0 {
                    format!(", {} retries", test.retry_count)
                } else {
                    String::new()
                };
                println!(
                    "    {} {} ({:.2?}{})",
                    mark,
                    test.test_id,
                    test.duration,
                    retries
                );
            }
        }
        let _ = io::stdout().flush();
    }

    fn print_summary(&self, report: &RunReport) {
        let summary = &report.summary;
        println!("{}", "─".repeat(50));

        let status = match summary.status {
            SuiteStatus::Pass => "PASSED".green().bold(),
            SuiteStatus::Warning => "PASSED WITH WARNINGS".yellow().bold(),
            SuiteStatus::Fail => "FAILED".red().bold(),
        };

        println!(
            "Run result: {} | {} suites, {} passed, {} failed, {} not run",
            status,
            summary.total_suites.to_string().bold(),
            summary.passed_suites.to_string().green().bold(),
            if summary.failed_suites > 0 {
                summary.failed_suites.to_string().red().bold()
            } else {
                summary.failed_suites.to_string().normal()
            },
            summary.skipped_suites
        );
        println!(
            "Tests: {} total, {} passed, {} failed, {} critical",
            summary.total_tests,
            summary.passed_tests,
            summary.failed_tests,
            summary.critical_failures
        );
        println!("Score: {:.1}", summary.overall_score);
        println!("Time: {:.2?}", summary.execution_time);

        if report.halted {
            println!(
                "{} halted on critical failure, not run: {}",
                "●".red(),
                report.not_run.join(", ")
            );
        }
    }

    fn print_failures(&self, report: &RunReport) {
        let failures: Vec<_> = report
            .suite_results
            .iter()
            .flat_map(|suite| {
                suite
                    .test_results
                    .iter()
                    .filter(|t| !t.passed)
                    .map(move |t| (suite.suite_id.as_str(), t))
            })
            .collect();
        let faults: Vec<_> = report
            .suite_results
            .iter()
            .filter_map(|s| s.fault.as_deref().map(|f| (s.suite_id.as_str(), f)))
            .collect();

        if failures.is_empty() && faults.is_empty() {
            return;
        }

        println!();
        println!("{}", "Failures:".red().bold());
        println!();

        for (suite, fault) in faults {
            println!("  {} {}", "●".red(), suite.bold());
            println!("      {}", fault.dimmed());
            println!();
        }

        for (suite, test) in failures {
            println!("  {} {}::{}", "●".red(), suite, test.test_id.bold());
            for error in &test.errors {
                for line in error.lines() {
                    println!("      {}", line.dimmed());
                }
            }
            println!();
        }
    }

    fn print_coverage(&self, report: &RunReport) {
        let coverage = &report.coverage;
        if !self.verbose && coverage.overall == 0.0 {
            return;
        }

        println!();
        println!("{} {:.1}%", "Coverage:".bold(), coverage.overall);
        Self::print_bucket("modalities", &coverage.modalities);
        Self::print_bucket("levels", &coverage.levels);
        Self::print_bucket("interactions", &coverage.interactions);
        if let Some(accessibility) = coverage.accessibility {
            println!("  {:<13} {:.1}%", "accessibility", accessibility);
        }
    }

    fn print_bucket(label: &str, bucket: &BTreeMap<String, f64>) {
        if bucket.is_empty() {
            return;
        }
        let entries: Vec<_> = bucket
            .iter()
            .map(|(key, value)| format!("{} {:.0}%", key, value))
            .collect();
        println!("  {:<13} {}", label, entries.join(", "));
    }
}

impl ReportHook for TextReporter {
    fn on_suite_start(&self, suite: &TestSuite) {
        if self.verbose {
            println!("{} {}", "RUN ".cyan().bold(), suite.id);
        }
    }

    fn on_suite_complete(&self, result: &SuiteResult) {
        self.print_suite(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{aggregate, Coverage, SuiteSummary, TestExecutionResult};
    use std::time::Duration;

    fn suite(id: &str, passed: bool) -> SuiteResult {
        let test = if passed {
            TestExecutionResult::pass("t1", 100.0, Duration::from_millis(4))
        } else {
            let error = "command exited with status 1";
            TestExecutionResult::fail("t1", error, Duration::from_millis(4))
        };
        let critical = usize::from(!passed);
        SuiteResult {
            suite_id: id.to_string(),
            passed,
            score: test.score,
            duration: Duration::from_millis(5),
            test_results: vec![test],
            coverage: Coverage::default(),
            summary: SuiteSummary {
                total_tests: 1,
                passed_tests: usize::from(passed),
                failed_tests: critical,
                skipped_tests: 0,
                critical_failures: critical,
                average_score: if passed { 100.0 } else { 0.0 },
                status: SuiteStatus::from_counts(critical, critical),
            },
            fault: None,
        }
    }

    #[test]
    fn test_reporter_all_pass() {
        colored::control::set_override(false);
        let reporter = TextReporter::new(true);
        let report = aggregate(
            vec![suite("a", true)],
            Duration::from_millis(5),
            Vec::new(),
            false,
        );

        // Just verify it doesn't panic
        reporter.on_suite_complete(&report.suite_results[0]);
        reporter.report(&report);
    }

    #[test]
    fn test_reporter_with_failures_and_halt() {
        colored::control::set_override(false);
        let reporter = TextReporter::new(false);
        let report = aggregate(
            vec![suite("a", false)],
            Duration::from_millis(5),
            vec!["b".to_string()],
            true,
        );

        reporter.report(&report);
    }

    #[test]
    fn test_reporter_empty() {
        let reporter = TextReporter::new(true);
        reporter.report(&aggregate(Vec::new(), Duration::ZERO, Vec::new(), false));
    }
}
