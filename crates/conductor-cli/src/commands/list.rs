//! List command - show configured suites and tests

use anyhow::Result;
use colored::*;
use conductor_core::SuiteRegistry;
use std::path::Path;

/// List suites and their tests
pub fn run(config: Option<&Path>, json: bool) -> Result<()> {
    let loaded = super::load_config(config)?;
    let registry = super::load_registry(&loaded)?;

    if json {
        println!("{}", to_json(&registry));
        return Ok(());
    }

    if registry.is_empty() {
        println!("{}", "No suites configured.".yellow());
        return Ok(());
    }

    for suite in &registry {
        let mode = if suite.parallel { "parallel" } else { "sequential" };
        println!(
            "{}{} ({} test{}, {})",
            suite.id.bold(),
            if suite.name != suite.id {
                format!(" \"{}\"", suite.name)
            } else {
                String::new()
            },
            suite.len(),
            if suite.len() == 1 { "" } else { "s" },
            mode
        );
        if !suite.dependencies.is_empty() {
            println!("    depends on: {}", suite.dependencies.join(", "));
        }
        for test in &suite.tests {
            let critical = if test.critical {
                " critical".red().to_string()
            } else {
                String::new()
            };
            println!("    - {} [{}]{}", test.id, test.kind.to_string().cyan(), critical);
        }
    }

    println!();
    println!(
        "{} suites, {} tests",
        registry.len().to_string().bold(),
        registry.test_count().to_string().bold()
    );
    Ok(())
}

fn to_json(registry: &SuiteRegistry) -> serde_json::Value {
    let suites: Vec<_> = registry
        .iter()
        .map(|suite| {
            let tests: Vec<_> = suite
                .tests
                .iter()
                .map(|test| {
                    serde_json::json!({
                        "id": test.id,
                        "name": test.name,
                        "kind": test.kind,
                        "modality": test.modality,
                        "level": test.level,
                        "critical": test.critical,
                    })
                })
                .collect();
            serde_json::json!({
                "id": suite.id,
                "name": suite.name,
                "parallel": suite.parallel,
                "dependencies": suite.dependencies,
                "tests": tests,
            })
        })
        .collect();
    serde_json::json!({ "suites": suites })
}
