use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use engkit_core::dashboard;
use std::path::Path;

pub fn run(root: &Path, output: Option<&Path>, open: bool, json: bool) -> anyhow::Result<()> {
    let summary = dashboard::write_dashboard(root, output, Utc::now())
        .with_context(|| format!("failed to generate dashboard for {}", root.display()))?;

    if json {
        print_json(&summary)?;
    } else {
        println!("Dashboard generated: {}", summary.path.display());
        println!(
            "  systems: {}  parameters: {}  decisions: {}  complete: {}%",
            summary.systems, summary.parameters, summary.decisions, summary.completion_percent
        );
    }

    if open {
        if let Err(e) = open::that(&summary.path) {
            eprintln!("  warning: could not open browser: {e}");
        }
    }
    Ok(())
}
