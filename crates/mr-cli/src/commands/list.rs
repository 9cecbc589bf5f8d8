//! List command implementation
//!
//! Prints the effective manifest with per-entry annotations. Never opens a
//! database connection.

use anyhow::{Context, Result};
use chrono::Utc;
use mr_runner::ExecutionPlan;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::build_run_config;

/// Execute the list command
pub(crate) fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let config = build_run_config(args, global, Utc::now());
    let plan = ExecutionPlan::resolve(&config).context("Failed to resolve manifest range")?;

    println!(
        "Manifest: mode={} entries={} root={}",
        config.mode,
        plan.len(),
        config.repo_root.display()
    );
    for line in plan_lines(&plan, args.include_optional) {
        println!("{line}");
    }
    Ok(())
}

/// One line per entry: position, annotations, file
fn plan_lines(plan: &ExecutionPlan, include_optional: bool) -> Vec<String> {
    let width = plan.len().to_string().len();
    plan.entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut notes = Vec::new();
            if !plan.range.contains(index) {
                notes.push("out of range".to_string());
            }
            if entry.optional {
                notes.push(if include_optional {
                    "optional".to_string()
                } else {
                    "optional, skipped".to_string()
                });
            }
            if let Some(kind) = entry.conditional {
                notes.push(format!("conditional: {kind}"));
            }
            let notes = if notes.is_empty() {
                String::new()
            } else {
                format!("  [{}]", notes.join("; "))
            };
            format!("{:>width$}. {}{}", index + 1, entry.file, notes)
        })
        .collect()
}
