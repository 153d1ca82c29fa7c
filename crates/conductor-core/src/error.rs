/// Orchestrator error types
///
/// Only configuration problems and dependency cycles surface as errors. Test
/// failures, timeouts and suite faults are recorded in result values instead.
use crate::model::TestKind;
use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Cyclic dependency detected at suite '{suite}': {cycle}")]
    CyclicDependency { suite: String, cycle: String },

    #[error("Suite '{suite}' depends on unknown suite '{dependency}'")]
    UnknownDependency { suite: String, dependency: String },

    #[error("Duplicate suite id: {0}")]
    DuplicateSuite(String),

    #[error("Duplicate test id '{test}' in suite '{suite}'")]
    DuplicateTest { suite: String, test: String },

    #[error("Unknown test kind '{kind}' for test '{test}'")]
    UnknownTestKind { test: String, kind: String },

    #[error("No handler registered for test kind '{kind}'")]
    MissingHandler { kind: TestKind },

    #[error("Suite not found: {0}")]
    SuiteNotFound(String),

    #[error("Invalid orchestrator configuration: {0}")]
    InvalidConfig(String),
}

impl OrchestratorError {
    /// Create a cyclic dependency error from the visit path
    pub fn cyclic(suite: impl Into<String>, path: &[String]) -> Self {
        Self::CyclicDependency {
            suite: suite.into(),
            cycle: path.join(" -> "),
        }
    }

    /// Create an unknown dependency error
    pub fn unknown_dependency(suite: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::UnknownDependency {
            suite: suite.into(),
            dependency: dependency.into(),
        }
    }

    /// Create an unknown test kind error
    pub fn unknown_kind(test: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnknownTestKind {
            test: test.into(),
            kind: kind.into(),
        }
    }

    /// Whether this error belongs to the configuration tier
    /// (everything except a dependency cycle)
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::CyclicDependency { .. })
    }
}
