//! Runs every scenario fixture and prints a pass/fail line per case.
//!
//! Usage: `dev-test-runner [GLOB]` (defaults to `fixtures/*.json`).
use anyhow::{Context, Result};
use colored::Colorize;
use schema_rules::scenario::Scenario;

fn main() -> Result<()> {
    let pattern = std::env::args().nth(1).unwrap_or_else(|| "fixtures/*.json".to_string());
    let mut total = 0usize;
    let mut failed = 0usize;

    for entry in glob::glob(&pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
        let path = entry?;
        let src = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let scenario = Scenario::parse(&src).with_context(|| format!("failed to parse {}", path.display()))?;
        let outcomes = scenario.run().with_context(|| format!("failed to compile {}", path.display()))?;

        println!("{} ({})", scenario.name.bold(), path.display());
        for outcome in &outcomes {
            total += 1;
            let label = format!("{} / {}", outcome.context, outcome.case);
            if outcome.passed() {
                println!("  {} {label}", "✓".green());
            } else {
                failed += 1;
                println!("  {} {label}", "✗".red().bold());
                println!("      expected: {}", serde_json::to_string(&outcome.expected)?);
                println!("      actual:   {}", serde_json::to_string(&outcome.actual)?);
            }
        }
    }

    let summary = format!("{total} cases, {failed} failed");
    if failed == 0 {
        println!("{}", summary.green());
        Ok(())
    } else {
        println!("{}", summary.red());
        anyhow::bail!("{failed} scenario case(s) failed")
    }
}
