use super::{Decision, HookEvent, HostResponse, ProjectFs, PRE_TOOL_USE_EVENT};
use crate::config::HookPolicy;
use crate::paths;
use std::path::Path;

const GATED_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];
const REFERENCE_EXTENSIONS: &[&str] = &["pdf", "md"];

/// Gate design and calculation edits on two documents: the target
/// system's understanding doc, and at least one reference document.
pub(super) fn check(event: &HookEvent, fs: &dyn ProjectFs, policy: &HookPolicy) -> Decision {
    if !event.is_event(PRE_TOOL_USE_EVENT) || !GATED_TOOLS.iter().any(|t| *t == event.tool_name()) {
        return Decision::Allow;
    }
    let path = normalize(event.target_path());
    if !is_design_file(&path, policy) && !is_calculation_file(&path) {
        return Decision::Allow;
    }

    let root = event.project_dir();
    let root_prefix = normalize(&root.to_string_lossy());
    let in_project = path
        .strip_prefix(root_prefix.trim_end_matches('/'))
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(path.as_str());
    if let Some(system) = system_from_path(in_project, policy) {
        if !understanding_ready(fs, &root, system, policy) {
            return Decision::Block(HostResponse::deny_tool(understanding_message(system, policy)));
        }
    }
    if !reference_docs_exist(fs, &root) {
        return Decision::Block(HostResponse::deny_tool(REFERENCE_MESSAGE));
    }
    Decision::Allow
}

/// Forward slashes and a leading `/`, so segment patterns like `/design/`
/// also match relative paths.
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

fn is_design_file(path: &str, policy: &HookPolicy) -> bool {
    let lower = path.to_lowercase();
    policy
        .design_indicators
        .iter()
        .any(|ind| !ind.is_empty() && lower.contains(&ind.to_lowercase()))
}

fn is_calculation_file(path: &str) -> bool {
    path.contains("/calculations/") && path.to_lowercase().ends_with(".ipynb")
}

/// The system a path belongs to: the first directory named after a known
/// system, else the directory directly below `design/`. File names never
/// count.
fn system_from_path<'a>(path: &'a str, policy: &HookPolicy) -> Option<&'a str> {
    let segments: Vec<&str> = path.split('/').collect();
    let dirs = &segments[..segments.len().saturating_sub(1)];

    if let Some(known) = dirs
        .iter()
        .find(|seg| policy.systems.iter().any(|s| s.as_str() == **seg))
    {
        return Some(*known);
    }
    dirs.windows(2)
        .find(|w| w[0] == "design" && !w[1].is_empty())
        .map(|w| w[1])
}

fn understanding_ready(fs: &dyn ProjectFs, root: &Path, system: &str, policy: &HookPolicy) -> bool {
    let path = paths::understanding_path(root, system);
    if !fs.exists(&path) {
        return false;
    }
    let content = match fs.read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot read understanding doc");
            return true;
        }
    };
    if content.matches("TODO").count() > policy.understanding_max_todo
        || content.matches("TBD").count() > policy.understanding_max_tbd
    {
        return false;
    }
    policy
        .understanding_sections
        .iter()
        .all(|section| content.contains(section.as_str()))
}

fn reference_docs_exist(fs: &dyn ProjectFs, root: &Path) -> bool {
    let dir = paths::reference_dir(root);
    match fs.any_file_with_extension(&dir, REFERENCE_EXTENSIONS) {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot scan reference docs");
            true
        }
    }
}

fn understanding_message(system: &str, policy: &HookPolicy) -> String {
    let sections: String = policy
        .understanding_sections
        .iter()
        .map(|s| format!("   - {s}\n"))
        .collect();
    format!(
        "\
❌ BLOCKED: No complete system understanding for '{system}'.

Before design or calculation work, document your understanding:

1. Create docs/systems/{system}/current-understanding.md
   (start from templates/system-understanding-template.md)
2. Fill in at least:
{sections}3. Resolve open markers (at most {max_todo} TODO and {max_tbd} TBD)

Or run /understand {system} to build it with the knowledge-builder agent.",
        max_todo = policy.understanding_max_todo,
        max_tbd = policy.understanding_max_tbd,
    )
}

const REFERENCE_MESSAGE: &str = "\
❌ BLOCKED: No reference documentation found.

Design and calculation work must be grounded in sources.

1. Add relevant papers, standards or datasheets to docs/reference/ (PDF or Markdown)
2. Index them with: engkit knowledge index
3. Search them with: engkit knowledge query \"<topic>\"

Then retry the edit.";
