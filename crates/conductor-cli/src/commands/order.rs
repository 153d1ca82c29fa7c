//! Order command - print the resolved suite order

use anyhow::Result;
use colored::*;
use conductor_core::{dependency_levels, resolve_order};
use std::path::Path;

/// Print the order suites would be admitted in
pub fn run(config: Option<&Path>, json: bool) -> Result<()> {
    let loaded = super::load_config(config)?;
    let registry = super::load_registry(&loaded)?;
    let order = resolve_order(&registry)?;

    if json {
        let levels = dependency_levels(&registry)?;
        println!(
            "{}",
            serde_json::json!({
                "order": order,
                "levels": levels,
            })
        );
        return Ok(());
    }

    if order.is_empty() {
        println!("{}", "No suites configured.".yellow());
        return Ok(());
    }

    for (index, id) in order.iter().enumerate() {
        let deps = registry
            .get(id)
            .map(|suite| suite.dependencies.join(", "))
            .unwrap_or_default();
        if deps.is_empty() {
            println!("{:>3}. {}", index + 1, id.bold());
        } else {
            println!("{:>3}. {} {}", index + 1, id.bold(), format!("(after {})", deps).dimmed());
        }
    }
    Ok(())
}
