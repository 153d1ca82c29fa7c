//! Test and suite definitions
//!
//! Definitions are built once at configuration time and never mutated while
//! a run is in progress.

use crate::error::{OrchestratorError, OrchestratorResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Kind of test, selecting which handler executes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    /// Component checks for one modality/level
    CrossModal,
    /// Accessibility audit
    Accessibility,
    /// Modality transition scenario
    Handoff,
    /// Performance check
    Performance,
}

impl TestKind {
    /// All kinds, in canonical order
    pub const ALL: [TestKind; 4] = [
        TestKind::CrossModal,
        TestKind::Accessibility,
        TestKind::Handoff,
        TestKind::Performance,
    ];

    /// String id used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrossModal => "cross-modal",
            Self::Accessibility => "accessibility",
            Self::Handoff => "handoff",
            Self::Performance => "performance",
        }
    }

    /// Interaction coverage category for this kind
    ///
    /// Accessibility tests feed the accessibility scalar instead.
    pub fn interaction(&self) -> Option<&'static str> {
        match self {
            Self::CrossModal => Some("integration"),
            Self::Handoff => Some("handoff"),
            Self::Performance => Some("performance"),
            Self::Accessibility => None,
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A single test to execute
#[derive(Debug, Clone, PartialEq)]
pub struct TestDefinition {
    /// Unique id within its suite
    pub id: String,
    pub name: String,
    pub kind: TestKind,
    /// Modality tag, only used for coverage
    pub modality: Option<String>,
    /// Abstraction level tag, only used for coverage
    pub level: Option<String>,
    /// Handler payload, opaque to the orchestrator
    pub config: Option<serde_json::Value>,
    /// Per-test timeout; the runner default applies when unset
    pub timeout: Option<Duration>,
    /// Per-test retry count; the runner default applies when unset
    pub retries: Option<u32>,
    /// A failure of this test fails its suite and may halt the run
    pub critical: bool,
}

impl TestDefinition {
    /// Create a new test definition with no tags and default policy
    pub fn new(id: impl Into<String>, kind: TestKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            modality: None,
            level: None,
            config: None,
            timeout: None,
            retries: None,
            critical: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Build a definition from its config file form
    pub fn from_spec(spec: &conductor_config::TestSpec) -> OrchestratorResult<Self> {
        let kind = spec
            .kind
            .parse::<TestKind>()
            .map_err(|kind| OrchestratorError::unknown_kind(&spec.id, kind))?;

        Ok(Self {
            id: spec.id.clone(),
            name: spec.display_name().to_string(),
            kind,
            modality: spec.modality.clone(),
            level: spec.level.clone(),
            config: spec.config.clone(),
            timeout: spec.timeout_ms.map(Duration::from_millis),
            retries: spec.retries,
            critical: spec.critical,
        })
    }
}

/// A named group of tests sharing dependency and parallelism policy
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub id: String,
    pub name: String,
    /// Tests in declaration order
    pub tests: Vec<TestDefinition>,
    /// Suites that must complete before this one starts
    pub dependencies: Vec<String>,
    /// Run tests concurrently instead of in declaration order
    pub parallel: bool,
}

impl TestSuite {
    /// Create a new empty sequential suite
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            tests: Vec::new(),
            dependencies: Vec::new(),
            parallel: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_test(mut self, test: TestDefinition) -> Self {
        self.tests.push(test);
        self
    }

    pub fn with_tests(mut self, tests: impl IntoIterator<Item = TestDefinition>) -> Self {
        self.tests.extend(tests);
        self
    }

    /// Add dependencies; repeated ids are ignored
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in dependencies {
            let dep = dep.into();
            if !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build a suite from its config file form
    pub fn from_spec(spec: &conductor_config::SuiteSpec) -> OrchestratorResult<Self> {
        let tests = spec
            .tests
            .iter()
            .map(TestDefinition::from_spec)
            .collect::<OrchestratorResult<Vec<_>>>()?;

        Ok(Self::new(&spec.id)
            .with_name(spec.display_name())
            .with_tests(tests)
            .with_dependencies(spec.dependencies.iter().cloned())
            .parallel(spec.parallel))
    }

    /// Number of tests in the suite
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether the suite has no tests
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
