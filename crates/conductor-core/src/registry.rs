//! Suite registry - the declared suite graph
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::model::{TestKind, TestSuite};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Suites by id, kept in insertion order
///
/// Read-only for the duration of a run; build a fresh registry for the next one.
#[derive(Debug, Clone, Default)]
pub struct SuiteRegistry {
    suites: Vec<TestSuite>,
    index: HashMap<String, usize>,
}

impl SuiteRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a suite
    ///
    /// Rejects a suite id that is already registered and duplicate test ids
    /// within the suite.
    pub fn add_suite(&mut self, suite: TestSuite) -> OrchestratorResult<()> {
        if self.index.contains_key(&suite.id) {
            return Err(OrchestratorError::DuplicateSuite(suite.id));
        }

        let mut seen = HashSet::new();
        for test in &suite.tests {
            if !seen.insert(test.id.as_str()) {
                return Err(OrchestratorError::DuplicateTest {
                    suite: suite.id.clone(),
                    test: test.id.clone(),
                });
            }
        }

        self.index.insert(suite.id.clone(), self.suites.len());
        self.suites.push(suite);
        Ok(())
    }

    /// Builder-style [`add_suite`](Self::add_suite)
    pub fn with_suite(mut self, suite: TestSuite) -> OrchestratorResult<Self> {
        self.add_suite(suite)?;
        Ok(self)
    }

    /// Build a registry from the `[[suite]]` tables of a config file
    pub fn from_config(config: &conductor_config::ProjectConfig) -> OrchestratorResult<Self> {
        let mut registry = Self::new();
        for spec in &config.suites {
            registry.add_suite(TestSuite::from_spec(spec)?)?;
        }
        Ok(registry)
    }

    /// Get a suite by id
    pub fn get(&self, id: &str) -> Option<&TestSuite> {
        self.index.get(id).map(|&i| &self.suites[i])
    }

    /// Whether a suite id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate suites in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TestSuite> {
        self.suites.iter()
    }

    /// Suite ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.suites.iter().map(|s| s.id.as_str())
    }

    /// Get suite count
    pub fn len(&self) -> usize {
        self.suites.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Total number of tests across all suites
    pub fn test_count(&self) -> usize {
        self.suites.iter().map(TestSuite::len).sum()
    }

    /// Test kinds used by any suite
    pub fn kinds(&self) -> BTreeSet<TestKind> {
        self.suites
            .iter()
            .flat_map(|s| s.tests.iter().map(|t| t.kind))
            .collect()
    }

    /// Validate the graph
    pub fn validate(&self) -> OrchestratorResult<()> {
        // Check all dependencies exist
        for suite in &self.suites {
            for dep in &suite.dependencies {
                if !self.contains(dep) {
                    return Err(OrchestratorError::unknown_dependency(&suite.id, dep));
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SuiteRegistry {
    type Item = &'a TestSuite;
    type IntoIter = std::slice::Iter<'a, TestSuite>;

    fn into_iter(self) -> Self::IntoIter {
        self.suites.iter()
    }
}
