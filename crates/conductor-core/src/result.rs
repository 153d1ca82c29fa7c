//! Result values produced by a run
//!
//! Every value here is created once and never mutated afterwards. All of them
//! serialize with serde so external renderers can consume a [`RunReport`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Serialize a `Duration` as whole milliseconds
mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Outcome of a single test
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecutionResult {
    pub test_id: String,
    pub passed: bool,
    /// 0-100
    pub score: f64,
    #[serde(rename = "durationMs", with = "duration_ms")]
    pub duration: Duration,
    /// Empty iff `passed`
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Attempts consumed beyond the first
    pub retry_count: u32,
}

impl TestExecutionResult {
    /// A passed result
    pub fn pass(test_id: impl Into<String>, score: f64, duration: Duration) -> Self {
        Self {
            test_id: test_id.into(),
            passed: true,
            score,
            duration,
            errors: Vec::new(),
            warnings: Vec::new(),
            retry_count: 0,
        }
    }

    /// A failed result with one error message and score 0
    pub fn fail(test_id: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            test_id: test_id.into(),
            passed: false,
            score: 0.0,
            duration,
            errors: vec![error.into()],
            warnings: Vec::new(),
            retry_count: 0,
        }
    }
}

/// Three-tier status shared by suites and runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuiteStatus {
    Pass,
    Fail,
    Warning,
}

impl SuiteStatus {
    /// FAIL on any critical failure, WARNING on any other failure, else PASS
    pub fn from_counts(critical_failures: usize, failures: usize) -> Self {
        if critical_failures > 0 {
            Self::Fail
        } else if failures > 0 {
            Self::Warning
        } else {
            Self::Pass
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for SuiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coverage percentages by bucket
///
/// A key is present only when at least one test carried the matching tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Coverage {
    pub modalities: BTreeMap<String, f64>,
    pub levels: BTreeMap<String, f64>,
    pub interactions: BTreeMap<String, f64>,
    /// `None` when no accessibility test contributed
    pub accessibility: Option<f64>,
    /// Unweighted mean of the three group means and the accessibility scalar
    pub overall: f64,
}

impl Coverage {
    /// Accessibility percentage, 0 when nothing was recorded
    pub fn accessibility_percent(&self) -> f64 {
        self.accessibility.unwrap_or(0.0)
    }

    /// Percentage for a modality, 0 when untouched
    pub fn modality(&self, key: &str) -> f64 {
        self.modalities.get(key).copied().unwrap_or(0.0)
    }

    /// Percentage for a level, 0 when untouched
    pub fn level(&self, key: &str) -> f64 {
        self.levels.get(key).copied().unwrap_or(0.0)
    }

    /// Percentage for an interaction category, 0 when untouched
    pub fn interaction(&self, key: &str) -> f64 {
        self.interactions.get(key).copied().unwrap_or(0.0)
    }
}

/// Per-suite counts and status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    /// Tests that never produced a result because the suite faulted
    pub skipped_tests: usize,
    pub critical_failures: usize,
    pub average_score: f64,
    pub status: SuiteStatus,
}

/// Outcome of one suite
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResult {
    pub suite_id: String,
    pub passed: bool,
    /// Mean of test scores, 0 for an empty suite
    pub score: f64,
    #[serde(rename = "durationMs", with = "duration_ms")]
    pub duration: Duration,
    /// Results in declaration order
    pub test_results: Vec<TestExecutionResult>,
    pub coverage: Coverage,
    pub summary: SuiteSummary,
    /// Set when the suite faulted outside any individual test
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

/// Run-wide counts and status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSummary {
    pub total_suites: usize,
    pub passed_suites: usize,
    pub failed_suites: usize,
    /// Suites never started because the run halted
    pub skipped_suites: usize,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub overall_score: f64,
    pub critical_failures: usize,
    pub status: SuiteStatus,
    #[serde(rename = "executionTimeMs", with = "duration_ms")]
    pub execution_time: Duration,
}

/// Report for a complete run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Suite results in resolved execution order
    pub suite_results: Vec<SuiteResult>,
    pub summary: GlobalSummary,
    pub coverage: Coverage,
    /// Suites never admitted, in resolved order
    pub not_run: Vec<String>,
    /// Whether admission stopped early on a critical failure
    pub halted: bool,
}

impl RunReport {
    /// Find a suite result by id
    pub fn suite(&self, suite_id: &str) -> Option<&SuiteResult> {
        self.suite_results.iter().find(|r| r.suite_id == suite_id)
    }

    /// Whether the run passed (no critical failures)
    pub fn passed(&self) -> bool {
        self.summary.status != SuiteStatus::Fail
    }

    /// Render the report as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
