//! Test-kind handlers
//!
//! The concrete test bodies live outside the orchestrator. Each [`TestKind`]
//! is bound to one [`TestHandler`] in a [`HandlerRegistry`] when the
//! orchestrator is built, so an unbound kind is caught before anything runs.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::model::{TestDefinition, TestKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Error raised by a handler while executing a test
///
/// The executor records it as a failed attempt; it never escapes a run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One keyed entry of a batch outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub key: String,
    pub passed: bool,
}

/// Pass/fail shape reported by a handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Single(bool),
    /// Keyed results, e.g. one per modality when none was requested
    Batch(Vec<BatchEntry>),
}

impl Outcome {
    /// Passed if the single flag is set, or every batch entry passed
    pub fn passed(&self) -> bool {
        match self {
            Self::Single(passed) => *passed,
            Self::Batch(entries) => entries.iter().all(|e| e.passed),
        }
    }

    /// Keys of failed batch entries
    pub fn failed_keys(&self) -> Vec<&str> {
        match self {
            Self::Single(_) => Vec::new(),
            Self::Batch(entries) => entries
                .iter()
                .filter(|e| !e.passed)
                .map(|e| e.key.as_str())
                .collect(),
        }
    }
}

/// Output of one handler invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerOutput {
    pub outcome: Outcome,
    /// Carried through verbatim when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Non-fatal notices, never affect pass/fail
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Failure details reported by the handler
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl HandlerOutput {
    /// A passed single outcome
    pub fn passed() -> Self {
        Self::single(true)
    }

    /// A failed single outcome
    pub fn failed(error: impl Into<String>) -> Self {
        Self::single(false).with_error(error)
    }

    pub fn single(passed: bool) -> Self {
        Self {
            outcome: Outcome::Single(passed),
            score: None,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A keyed batch outcome
    pub fn batch<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self {
            outcome: Outcome::Batch(
                entries
                    .into_iter()
                    .map(|(key, passed)| BatchEntry {
                        key: key.into(),
                        passed,
                    })
                    .collect(),
            ),
            score: None,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }
}

/// Executes tests of one kind
#[async_trait]
pub trait TestHandler: Send + Sync {
    async fn execute(&self, test: &TestDefinition) -> Result<HandlerOutput, HandlerError>;
}

/// Handler backed by an async closure
pub struct FnHandler<F> {
    func: F,
}

/// Wrap an async closure as a [`TestHandler`]
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(TestDefinition) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerOutput, HandlerError>> + Send,
{
    FnHandler { func }
}

#[async_trait]
impl<F, Fut> TestHandler for FnHandler<F>
where
    F: Fn(TestDefinition) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerOutput, HandlerError>> + Send,
{
    async fn execute(&self, test: &TestDefinition) -> Result<HandlerOutput, HandlerError> {
        (self.func)(test.clone()).await
    }
}

/// Binding from test kind to handler
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TestKind, Arc<dyn TestHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to a kind, replacing any previous binding
    pub fn register(&mut self, kind: TestKind, handler: Arc<dyn TestHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_handler(mut self, kind: TestKind, handler: impl TestHandler + 'static) -> Self {
        self.register(kind, Arc::new(handler));
        self
    }

    /// Bind the same handler to every kind
    pub fn with_all(mut self, handler: Arc<dyn TestHandler>) -> Self {
        for kind in TestKind::ALL {
            self.register(kind, Arc::clone(&handler));
        }
        self
    }

    pub fn get(&self, kind: TestKind) -> Option<Arc<dyn TestHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Handler for a kind, or the configuration error for an unbound kind
    pub fn resolve(&self, kind: TestKind) -> OrchestratorResult<Arc<dyn TestHandler>> {
        self.get(kind)
            .ok_or(OrchestratorError::MissingHandler { kind })
    }

    pub fn contains(&self, kind: TestKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Check that every kind in `kinds` has a handler
    pub fn ensure_bound(&self, kinds: &BTreeSet<TestKind>) -> OrchestratorResult<()> {
        match kinds.iter().find(|kind| !self.contains(**kind)) {
            Some(&kind) => Err(OrchestratorError::MissingHandler { kind }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("HandlerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

/// Weights a handoff collaborator applies to its sub-scores
///
/// The orchestrator never applies these itself; a handoff handler folds its
/// measurements into the single score it reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandoffWeights {
    pub context: f64,
    pub state: f64,
    pub accessibility: f64,
    pub performance: f64,
    pub recovery: f64,
}

impl Default for HandoffWeights {
    fn default() -> Self {
        Self {
            context: 0.25,
            state: 0.25,
            accessibility: 0.20,
            performance: 0.15,
            recovery: 0.15,
        }
    }
}

/// Sub-scores measured for one handoff scenario, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HandoffScores {
    pub context: f64,
    pub state: f64,
    pub accessibility: f64,
    pub performance: f64,
    pub recovery: f64,
}

impl HandoffWeights {
    /// Weighted handoff score, normalised by the weight total
    pub fn score(&self, scores: &HandoffScores) -> f64 {
        let total =
            self.context + self.state + self.accessibility + self.performance + self.recovery;
        if total <= 0.0 {
            return 0.0;
        }
        (scores.context * self.context
            + scores.state * self.state
            + scores.accessibility * self.accessibility
            + scores.performance * self.performance
            + scores.recovery * self.recovery)
            / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_passes_only_when_all_pass() {
        let all = HandlerOutput::batch([("camera", true), ("voice", true)]);
        assert!(all.outcome.passed());

        let some = HandlerOutput::batch([("camera", true), ("voice", false)]);
        assert!(!some.outcome.passed());
        assert_eq!(some.outcome.failed_keys(), vec!["voice"]);
    }

    #[test]
    fn test_empty_batch_passes() {
        let empty = HandlerOutput::batch(Vec::<(String, bool)>::new());
        assert!(empty.outcome.passed());
    }

    #[test]
    fn test_output_deserializes_both_shapes() {
        let single: HandlerOutput =
            serde_json::from_str(r#"{"outcome": false, "errors": ["contrast too low"]}"#).unwrap();
        assert_eq!(single.outcome, Outcome::Single(false));
        assert_eq!(single.errors, vec!["contrast too low".to_string()]);

        let batch: HandlerOutput = serde_json::from_str(
            r#"{"outcome": [{"key": "atom", "passed": true}], "score": 92.5, "warnings": ["slow"]}"#,
        )
        .unwrap();
        assert!(batch.outcome.passed());
        assert_eq!(batch.score, Some(92.5));
        assert_eq!(batch.warnings, vec!["slow".to_string()]);
    }

    #[tokio::test]
    async fn test_fn_handler_receives_definition() {
        let handler = handler_fn(|test: TestDefinition| async move {
            Ok(HandlerOutput::passed().with_warning(test.id))
        });

        let output = handler
            .execute(&TestDefinition::new("latency", TestKind::Performance))
            .await
            .unwrap();
        assert_eq!(output.warnings, vec!["latency".to_string()]);
    }

    #[test]
    fn test_registry_missing_kind() {
        let registry = HandlerRegistry::new().with_handler(
            TestKind::Handoff,
            handler_fn(|_| async { Ok(HandlerOutput::passed()) }),
        );

        assert!(registry.resolve(TestKind::Handoff).is_ok());
        assert!(matches!(
            registry.resolve(TestKind::Performance),
            Err(OrchestratorError::MissingHandler {
                kind: TestKind::Performance
            })
        ));

        let kinds: BTreeSet<_> = [TestKind::Handoff, TestKind::Accessibility].into();
        assert!(matches!(
            registry.ensure_bound(&kinds),
            Err(OrchestratorError::MissingHandler {
                kind: TestKind::Accessibility
            })
        ));
    }

    #[test]
    fn test_handoff_weights_default_sum_to_one() {
        let weights = HandoffWeights::default();
        let perfect = HandoffScores {
            context: 100.0,
            state: 100.0,
            accessibility: 100.0,
            performance: 100.0,
            recovery: 100.0,
        };
        assert!((weights.score(&perfect) - 100.0).abs() < 1e-9);

        let partial = HandoffScores {
            context: 100.0,
            state: 0.0,
            ..Default::default()
        };
        assert!((weights.score(&partial) - 25.0).abs() < 1e-9);
    }
}
