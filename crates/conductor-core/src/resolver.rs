//! Execution order computation using depth-first topological sort
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::model::TestSuite;
use crate::registry::SuiteRegistry;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Compute a linear execution order over the registry
///
/// Every suite appears after all of its dependencies. Roots are visited in
/// registry insertion order and dependencies in declaration order, so the
/// result is deterministic. Fails with `CyclicDependency` naming the suite
/// where the cycle closed.
pub fn resolve_order(registry: &SuiteRegistry) -> OrchestratorResult<Vec<String>> {
    registry.validate()?;

    let mut states: HashMap<&str, VisitState> = HashMap::with_capacity(registry.len());
    let mut order = Vec::with_capacity(registry.len());

    for id in registry.ids() {
        visit(registry, id, &mut states, &mut order)?;
    }

    Ok(order)
}

/// Post-order walk from `root` with an explicit stack
///
/// Each frame holds a suite on the current path and the index of its next
/// dependency to visit, so chain depth never grows the call stack.
fn visit<'a>(
    registry: &'a SuiteRegistry,
    root: &'a str,
    states: &mut HashMap<&'a str, VisitState>,
    order: &mut Vec<String>,
) -> OrchestratorResult<()> {
    if states.contains_key(root) {
        return Ok(());
    }

    let mut stack: Vec<(&'a TestSuite, usize)> = Vec::new();
    enter(registry, root, states, &mut stack)?;

    while let Some(frame) = stack.last_mut() {
        let suite = frame.0;
        let next = suite.dependencies.get(frame.1);
        frame.1 += 1;

        let Some(dep) = next else {
            states.insert(&suite.id, VisitState::Visited);
            order.push(suite.id.clone());
            stack.pop();
            continue;
        };

        match states.get(dep.as_str()).copied() {
            Some(VisitState::Visited) => {}
            Some(VisitState::Visiting) => {
                // Found cycle - report it starting from the re-entered suite
                let start = stack.iter().position(|(s, _)| s.id == *dep).unwrap_or(0);
                let mut cycle: Vec<String> =
                    stack[start..].iter().map(|(s, _)| s.id.clone()).collect();
                cycle.push(dep.clone());
                return Err(OrchestratorError::cyclic(dep.as_str(), &cycle));
            }
            None => enter(registry, dep, states, &mut stack)?,
        }
    }

    Ok(())
}

fn enter<'a>(
    registry: &'a SuiteRegistry,
    id: &'a str,
    states: &mut HashMap<&'a str, VisitState>,
    stack: &mut Vec<(&'a TestSuite, usize)>,
) -> OrchestratorResult<()> {
    let Some(suite) = registry.get(id) else {
        return Err(OrchestratorError::SuiteNotFound(id.to_string()));
    };
    states.insert(&suite.id, VisitState::Visiting);
    stack.push((suite, 0));
    Ok(())
}

/// Group the resolved order into dependency levels
///
/// Suites in the same level have no dependency on each other. Used for
/// display; the orchestrator schedules from the linear order.
pub fn dependency_levels(registry: &SuiteRegistry) -> OrchestratorResult<Vec<Vec<String>>> {
    let order = resolve_order(registry)?;
    let mut depth: HashMap<&str, usize> = HashMap::with_capacity(order.len());
    let mut levels: Vec<Vec<String>> = Vec::new();

    for id in &order {
        let level = registry
            .get(id)
            .map(|suite| {
                suite
                    .dependencies
                    .iter()
                    .filter_map(|dep| depth.get(dep.as_str()))
                    .map(|d| d + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        depth.insert(id, level);
        if levels.len() <= level {
            levels.resize_with(level + 1, Vec::new);
        }
        levels[level].push(id.clone());
    }

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry(suites: &[(&str, &[&str])]) -> SuiteRegistry {
        let mut registry = SuiteRegistry::new();
        for (id, deps) in suites {
            registry
                .add_suite(TestSuite::new(*id).with_dependencies(deps.iter().copied()))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_empty_graph() {
        let order = resolve_order(&SuiteRegistry::new()).unwrap();
        assert_eq!(order, Vec::<String>::new());
    }

    #[test]
    fn test_single_suite_no_deps() {
        let order = resolve_order(&registry(&[("main", &[])])).unwrap();
        assert_eq!(order, vec!["main"]);
    }

    #[test]
    fn test_linear_dependency_chain() {
        let order = resolve_order(&registry(&[("a", &["b"]), ("b", &["c"]), ("c", &[])])).unwrap();
        // c must come before b, b must come before a
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_independent_suites_keep_insertion_order() {
        let order = resolve_order(&registry(&[("z", &[]), ("y", &[]), ("x", &[])])).unwrap();
        assert_eq!(order, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_diamond_dependency() {
        let order = resolve_order(&registry(&[
            ("a", &["b", "c"]),
            ("b", &["d"]),
            ("c", &["d"]),
            ("d", &[]),
        ]))
        .unwrap();

        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let result = resolve_order(&registry(&[("a", &["b"]), ("b", &["a"])]));

        match result {
            Err(OrchestratorError::CyclicDependency { suite, cycle }) => {
                assert_eq!(suite, "a");
                assert_eq!(cycle, "a -> b -> a");
            }
            other => panic!("Expected CyclicDependency error, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix() {
        let result = resolve_order(&registry(&[
            ("entry", &["x"]),
            ("x", &["y"]),
            ("y", &["z"]),
            ("z", &["x"]),
        ]));

        match result {
            Err(OrchestratorError::CyclicDependency { suite, cycle }) => {
                assert_eq!(suite, "x");
                assert_eq!(cycle, "x -> y -> z -> x");
            }
            other => panic!("Expected CyclicDependency error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency() {
        let result = resolve_order(&registry(&[("solo", &["solo"])]));
        assert!(matches!(
            result,
            Err(OrchestratorError::CyclicDependency { ref suite, .. }) if suite == "solo"
        ));
    }

    #[test]
    fn test_unknown_dependency_fails_before_visit() {
        let result = resolve_order(&registry(&[("a", &["ghost"])]));
        assert!(matches!(
            result,
            Err(OrchestratorError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        const DEPTH: usize = 200_000;
        let mut registry = SuiteRegistry::new();
        for i in 0..DEPTH {
            let suite = TestSuite::new(format!("s{i}"));
            let suite = if i + 1 < DEPTH {
                suite.with_dependencies([format!("s{}", i + 1)])
            } else {
                suite
            };
            registry.add_suite(suite).unwrap();
        }

        let order = resolve_order(&registry).unwrap();

        assert_eq!(order.len(), DEPTH);
        assert_eq!(order.first().map(String::as_str), Some("s199999"));
        assert_eq!(order.last().map(String::as_str), Some("s0"));
    }

    #[test]
    fn test_dependency_levels_diamond() {
        let levels = dependency_levels(&registry(&[
            ("a", &["b", "c"]),
            ("b", &["d"]),
            ("c", &["d"]),
            ("d", &[]),
        ]))
        .unwrap();

        assert_eq!(
            levels,
            vec![
                vec!["d".to_string()],
                vec!["b".to_string(), "c".to_string()],
                vec!["a".to_string()],
            ]
        );
    }
}
