//! Coverage bucketing
//!
//! Per suite, each bucket key holds the percentage of tagged tests that
//! passed. Across suites, each key is the mean over the suites that recorded
//! a non-zero value for it; a key seen only at 0 stays at 0. In both cases
//! `overall` is the flat four-way mean of the modality, level and
//! interaction group means plus the accessibility scalar.

use crate::model::{TestDefinition, TestKind};
use crate::result::{Coverage, TestExecutionResult};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    passed: usize,
    total: usize,
}

impl Tally {
    fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        }
    }

    fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }
}

fn percentages(tallies: BTreeMap<String, Tally>) -> BTreeMap<String, f64> {
    tallies
        .into_iter()
        .map(|(key, tally)| (key, tally.percent()))
        .collect()
}

fn mean<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Flat mean of the three group means and the accessibility scalar
///
/// An empty group and a missing accessibility value each count as 0.
pub fn overall(
    modalities: &BTreeMap<String, f64>,
    levels: &BTreeMap<String, f64>,
    interactions: &BTreeMap<String, f64>,
    accessibility: Option<f64>,
) -> f64 {
    (mean(modalities.values())
        + mean(levels.values())
        + mean(interactions.values())
        + accessibility.unwrap_or(0.0))
        / 4.0
}

/// Compute coverage for one suite from its tests and the results collected
///
/// Tests without a result (a faulted suite) don't contribute.
pub fn suite_coverage(tests: &[TestDefinition], results: &[TestExecutionResult]) -> Coverage {
    let outcomes: HashMap<&str, bool> = results
        .iter()
        .map(|r| (r.test_id.as_str(), r.passed))
        .collect();

    let mut modalities: BTreeMap<String, Tally> = BTreeMap::new();
    let mut levels: BTreeMap<String, Tally> = BTreeMap::new();
    let mut interactions: BTreeMap<String, Tally> = BTreeMap::new();
    let mut accessibility: Option<Tally> = None;

    for test in tests {
        let Some(&passed) = outcomes.get(test.id.as_str()) else {
            continue;
        };

        if let Some(modality) = &test.modality {
            modalities.entry(modality.clone()).or_default().record(passed);
        }
        if let Some(level) = &test.level {
            levels.entry(level.clone()).or_default().record(passed);
        }
        if let Some(category) = test.kind.interaction() {
            interactions
                .entry(category.to_string())
                .or_default()
                .record(passed);
        }
        if test.kind == TestKind::Accessibility {
            accessibility.get_or_insert_with(Tally::default).record(passed);
        }
    }

    let modalities = percentages(modalities);
    let levels = percentages(levels);
    let interactions = percentages(interactions);
    let accessibility = accessibility.map(|t| t.percent());
    let overall = overall(&modalities, &levels, &interactions, accessibility);

    Coverage {
        modalities,
        levels,
        interactions,
        accessibility,
        overall,
    }
}

fn merge_bucket<'a>(
    coverages: &[&'a Coverage],
    bucket: impl Fn(&'a Coverage) -> &'a BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for coverage in coverages {
        for (key, value) in bucket(*coverage) {
            let entry = sums.entry(key.clone()).or_insert((0.0, 0));
            if *value > 0.0 {
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }
    sums.into_iter()
        .map(|(key, (sum, count))| {
            let value = if count == 0 { 0.0 } else { sum / count as f64 };
            (key, value)
        })
        .collect()
}

/// Combine suite coverages into run-wide coverage
///
/// Each key is averaged over the suites that recorded a non-zero value for
/// it. The accessibility scalar follows the same rule.
pub fn merge(coverages: &[&Coverage]) -> Coverage {
    let modalities = merge_bucket(coverages, |c| &c.modalities);
    let levels = merge_bucket(coverages, |c| &c.levels);
    let interactions = merge_bucket(coverages, |c| &c.interactions);

    let seen = coverages.iter().any(|c| c.accessibility.is_some());
    let recorded: Vec<f64> = coverages
        .iter()
        .filter_map(|c| c.accessibility)
        .filter(|v| *v > 0.0)
        .collect();
    let accessibility = seen.then(|| mean(&recorded));

    let overall = overall(&modalities, &levels, &interactions, accessibility);

    Coverage {
        modalities,
        levels,
        interactions,
        accessibility,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn outcome(id: &str, passed: bool) -> TestExecutionResult {
        if passed {
            TestExecutionResult::pass(id, 100.0, Duration::ZERO)
        } else {
            TestExecutionResult::fail(id, "failed", Duration::ZERO)
        }
    }

    #[test]
    fn test_untagged_tests_do_not_contribute() {
        let tests = vec![TestDefinition::new("a", TestKind::Accessibility)];
        let results = vec![outcome("a", true)];

        let coverage = suite_coverage(&tests, &results);

        assert!(coverage.modalities.is_empty());
        assert!(coverage.levels.is_empty());
        assert!(coverage.interactions.is_empty());
        assert_eq!(coverage.accessibility, Some(100.0));
        assert_eq!(coverage.overall, 25.0);
    }

    #[test]
    fn test_suite_bucket_percentages() {
        let tests = vec![
            TestDefinition::new("cam-1", TestKind::CrossModal)
                .with_modality("camera")
                .with_level("atom"),
            TestDefinition::new("cam-2", TestKind::CrossModal)
                .with_modality("camera")
                .with_level("molecule"),
            TestDefinition::new("voice-1", TestKind::Handoff).with_modality("voice"),
        ];
        let results = vec![
            outcome("cam-1", true),
            outcome("cam-2", false),
            outcome("voice-1", true),
        ];

        let coverage = suite_coverage(&tests, &results);

        assert_eq!(coverage.modality("camera"), 50.0);
        assert_eq!(coverage.modality("voice"), 100.0);
        assert_eq!(coverage.level("atom"), 100.0);
        assert_eq!(coverage.level("molecule"), 0.0);
        assert_eq!(coverage.interaction("integration"), 50.0);
        assert_eq!(coverage.interaction("handoff"), 100.0);
        assert_eq!(coverage.accessibility, None);
        // (75 + 50 + 75 + 0) / 4
        assert_eq!(coverage.overall, 50.0);
    }

    #[test]
    fn test_missing_results_are_skipped() {
        let tests = vec![
            TestDefinition::new("a", TestKind::CrossModal).with_modality("text"),
            TestDefinition::new("b", TestKind::CrossModal).with_modality("text"),
        ];
        let results = vec![outcome("a", true)];

        let coverage = suite_coverage(&tests, &results);
        assert_eq!(coverage.modality("text"), 100.0);
    }

    #[test]
    fn test_merge_averages_only_recording_suites() {
        let mut a = Coverage::default();
        a.modalities.insert("camera".to_string(), 100.0);
        a.modalities.insert("voice".to_string(), 40.0);
        let mut b = Coverage::default();
        b.modalities.insert("voice".to_string(), 100.0);
        b.accessibility = Some(80.0);

        let merged = merge(&[&a, &b]);

        assert_eq!(merged.modality("camera"), 100.0);
        assert_eq!(merged.modality("voice"), 70.0);
        assert_eq!(merged.modality("text"), 0.0);
        assert_eq!(merged.accessibility, Some(80.0));
        // (85 + 0 + 0 + 80) / 4
        assert_eq!(merged.overall, 41.25);
    }

    #[test]
    fn test_merge_skips_zero_values() {
        let mut a = Coverage::default();
        a.modalities.insert("camera".to_string(), 0.0);
        a.modalities.insert("text".to_string(), 0.0);
        a.accessibility = Some(0.0);
        let mut b = Coverage::default();
        b.modalities.insert("camera".to_string(), 100.0);
        b.accessibility = Some(60.0);

        let merged = merge(&[&a, &b]);

        assert_eq!(merged.modality("camera"), 100.0);
        assert_eq!(merged.modalities.get("text"), Some(&0.0));
        assert_eq!(merged.accessibility, Some(60.0));
    }

    #[test]
    fn test_merge_all_zero_accessibility() {
        let mut a = Coverage::default();
        a.accessibility = Some(0.0);

        let merged = merge(&[&a]);
        assert_eq!(merged.accessibility, Some(0.0));
    }

    #[test]
    fn test_merge_nothing() {
        let merged = merge(&[]);
        assert_eq!(merged, Coverage::default());
    }
}
