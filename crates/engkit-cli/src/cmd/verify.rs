use crate::output::print_json;
use engkit_core::verify::{self, CheckLevel, Report};
use std::path::Path;

/// Returns the process exit code for the report's status.
pub fn run(root: &Path, strict: bool, json: bool) -> anyhow::Result<i32> {
    let report = verify::verify(root, strict)?;
    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(report.status.exit_code())
}

fn tag(level: CheckLevel) -> &'static str {
    match level {
        CheckLevel::Pass => "PASS",
        CheckLevel::Warn => "WARN",
        CheckLevel::Fail => "FAIL",
        CheckLevel::Info => "INFO",
    }
}

fn print_report(report: &Report) {
    println!("Verifying: {}", report.path.display());
    for section in &report.sections {
        println!("\n[{}]", section.name);
        for check in &section.checks {
            println!("  [{}] {}", tag(check.level), check.message);
        }
    }
    println!();
    println!("{}", "=".repeat(60));
    println!(
        "SUMMARY: {} passed, {} warnings, {} errors",
        report.passes, report.warnings, report.errors
    );
    println!("STATUS: {}", report.status.label());
}
