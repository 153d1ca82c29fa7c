//! Conductor test orchestration engine
//!
//! Runs registered test suites against pluggable handlers:
//! - Suite registry and dependency ordering
//! - Per-test timeouts and bounded retries
//! - Bounded suite concurrency with halt-on-critical-failure
//! - Coverage and score aggregation into a run report
//! - Live suite status for introspection

pub mod aggregate;
pub mod coverage;
pub mod error;
pub mod executor;
pub mod handler;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod result;
pub mod runner;
pub mod status;

// Re-export main types
pub use aggregate::aggregate;
pub use error::{OrchestratorError, OrchestratorResult};
pub use executor::{ExecutionPolicy, TestExecutor};
pub use handler::{
    handler_fn, BatchEntry, FnHandler, HandlerError, HandlerOutput, HandlerRegistry,
    HandoffScores, HandoffWeights, Outcome, TestHandler,
};
pub use model::{TestDefinition, TestKind, TestSuite};
pub use orchestrator::{Orchestrator, OrchestratorConfig, ReportHook};
pub use registry::SuiteRegistry;
pub use resolver::{dependency_levels, resolve_order};
pub use result::{
    Coverage, GlobalSummary, RunReport, SuiteResult, SuiteStatus, SuiteSummary,
    TestExecutionResult,
};
pub use runner::SuiteRunner;
pub use status::{StatusTracker, SuiteState};

// Re-export config types for convenience
pub use conductor_config::{OrchestratorSection, ProjectConfig};
