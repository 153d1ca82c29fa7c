//! In-flight suite status for introspection during a run

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of one suite within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteState {
    /// Waiting for dependencies or a concurrency slot
    Pending,
    Running,
    /// Finished without critical failures
    Completed,
    /// Finished with critical failures or a fault
    Failed,
    /// Never admitted because the run halted
    Skipped,
}

impl SuiteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the suite has reached a final state
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for SuiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared table of suite states
///
/// Cloning yields another handle to the same table, so a caller can watch a
/// run from another task while the orchestrator drives it.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    states: Arc<RwLock<HashMap<String, SuiteState>>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the table to `Pending` for the given suites
    pub fn reset<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        let mut states = self.states.write();
        states.clear();
        states.extend(ids.into_iter().map(|id| (id.to_string(), SuiteState::Pending)));
    }

    pub fn set(&self, id: &str, state: SuiteState) {
        self.states.write().insert(id.to_string(), state);
    }

    /// State of a suite, `None` if it is not part of the current run
    pub fn get(&self, id: &str) -> Option<SuiteState> {
        self.states.read().get(id).copied()
    }

    /// Number of suites currently in a given state
    pub fn count(&self, state: SuiteState) -> usize {
        self.states.read().values().filter(|s| **s == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_marks_pending() {
        let tracker = StatusTracker::new();
        tracker.set("stale", SuiteState::Completed);
        tracker.reset(["a", "b"]);

        assert_eq!(tracker.get("a"), Some(SuiteState::Pending));
        assert_eq!(tracker.get("b"), Some(SuiteState::Pending));
        assert_eq!(tracker.get("stale"), None);
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = StatusTracker::new();
        let watcher = tracker.clone();
        tracker.reset(["a"]);
        tracker.set("a", SuiteState::Running);

        assert_eq!(watcher.get("a"), Some(SuiteState::Running));
        assert_eq!(watcher.count(SuiteState::Running), 1);
    }

    #[test]
    fn test_finished_states() {
        assert!(!SuiteState::Pending.is_finished());
        assert!(!SuiteState::Running.is_finished());
        assert!(SuiteState::Completed.is_finished());
        assert!(SuiteState::Failed.is_finished());
        assert!(SuiteState::Skipped.is_finished());
    }
}
