//! Read-side model of a project's `CONTEXT.md` and decision records.

use crate::error::Result;
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

const PHASE_MARKER: &str = "**Current Phase:**";
const BLOCKING_MARKER: &str = "**Blocking Issues:**";
const NEXT_ACTIONS_MARKER: &str = "**Next Actions:**";
const PARAMETERS_HEADING: &str = "## Critical Parameters";
const SYSTEMS_HEADING: &str = "## System Status";
const UNCHECKED: &str = "- [ ]";

pub const UNKNOWN_PHASE: &str = "Unknown";
pub const NO_BLOCKERS: &str = "None";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextDoc {
    pub phase: String,
    pub blocking: String,
    pub next_actions: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub systems: Vec<SystemStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    pub name: String,
    pub status: String,
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub id: String,
    pub title: String,
    pub path: PathBuf,
}

impl Default for ContextDoc {
    fn default() -> Self {
        Self {
            phase: UNKNOWN_PHASE.to_string(),
            blocking: NO_BLOCKERS.to_string(),
            next_actions: Vec::new(),
            parameters: Vec::new(),
            systems: Vec::new(),
        }
    }
}

impl ContextDoc {
    /// Parse `<root>/CONTEXT.md`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::context_md_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no CONTEXT.md");
            return Ok(Self::default());
        }
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn parse(content: &str) -> Self {
        let phase = content
            .lines()
            .find_map(|l| l.split_once(PHASE_MARKER).map(|(_, rest)| rest.trim()))
            .filter(|p| !p.is_empty())
            .unwrap_or(UNKNOWN_PHASE)
            .to_string();

        let blocking = after_marker(content, BLOCKING_MARKER)
            .map(|rest| paragraph_block(rest).trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| NO_BLOCKERS.to_string());

        let next_actions = after_marker(content, NEXT_ACTIONS_MARKER)
            .map(|rest| {
                until_heading(rest)
                    .lines()
                    .filter_map(|l| l.trim().strip_prefix(UNCHECKED))
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let parameters = section(content, PARAMETERS_HEADING)
            .map(table_rows)
            .unwrap_or_default()
            .into_iter()
            .map(|mut cells| Parameter {
                source: cells.swap_remove(2),
                value: cells.swap_remove(1),
                name: cells.swap_remove(0),
            })
            .collect();

        let systems = section(content, SYSTEMS_HEADING)
            .map(table_rows)
            .unwrap_or_default()
            .into_iter()
            .map(|mut cells| SystemStatus {
                documentation: cells.swap_remove(2),
                status: cells.swap_remove(1),
                name: cells.swap_remove(0),
            })
            .collect();

        Self {
            phase,
            blocking,
            next_actions,
            parameters,
            systems,
        }
    }

    /// True unless the blocking paragraph says there are none.
    pub fn has_blockers(&self) -> bool {
        let text = self.blocking.trim().trim_start_matches(['-', '*', ' ']);
        !(text.is_empty() || text.to_lowercase().starts_with("none"))
    }

    pub fn completed_systems(&self) -> usize {
        self.systems
            .iter()
            .filter(|s| status_class(&s.status) == StatusClass::Complete)
            .count()
    }

    pub fn in_progress_systems(&self) -> usize {
        self.systems
            .iter()
            .filter(|s| status_class(&s.status) == StatusClass::Progress)
            .count()
    }

    /// Whole-number share of complete systems; 0 with no systems.
    pub fn completion_percent(&self) -> u32 {
        let total = self.systems.len();
        if total == 0 {
            return 0;
        }
        (self.completed_systems() * 100 / total) as u32
    }
}

// ---------------------------------------------------------------------------
// Status classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Complete,
    Progress,
    Pending,
    Blocked,
}

impl StatusClass {
    pub fn css_class(&self) -> &'static str {
        match self {
            StatusClass::Complete => "status-complete",
            StatusClass::Progress => "status-progress",
            StatusClass::Pending => "status-pending",
            StatusClass::Blocked => "status-blocked",
        }
    }
}

pub fn status_class(status: &str) -> StatusClass {
    let s = status.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| s.contains(w));
    if has(&["concept", "complete"]) {
        StatusClass::Complete
    } else if has(&["requirements", "research", "defined"]) {
        StatusClass::Progress
    } else if has(&["basic", "placeholder"]) {
        StatusClass::Pending
    } else {
        StatusClass::Blocked
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// The newest `limit` decision records (`docs/decisions/DEC-*.md`), by
/// descending file name.
pub fn recent_decisions(root: &Path, limit: usize) -> Result<Vec<DecisionRecord>> {
    let dir = paths::decisions_dir(root);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("DEC-") && n.ends_with(".md"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    files.reverse();
    files.truncate(limit);

    let mut records = Vec::with_capacity(files.len());
    for path in files {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = std::fs::read_to_string(&path)?;
        let title = content
            .lines()
            .find_map(|l| l.strip_prefix("# "))
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| id.clone());
        records.push(DecisionRecord { id, title, path });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Markdown slicing
// ---------------------------------------------------------------------------

fn after_marker<'a>(content: &'a str, marker: &str) -> Option<&'a str> {
    content.find(marker).map(|i| &content[i + marker.len()..])
}

/// Text from `heading` to the next `## ` heading.
fn section<'a>(content: &'a str, heading: &str) -> Option<&'a str> {
    let start = content
        .match_indices(heading)
        .find(|(i, _)| *i == 0 || content[..*i].ends_with('\n'))
        .map(|(i, _)| i + heading.len())?;
    Some(until_heading(&content[start..]))
}

fn until_heading(text: &str) -> &str {
    match text.find("\n## ") {
        Some(end) => &text[..end],
        None => text,
    }
}

/// The first paragraph of `text`, ending at a blank line followed by a bold
/// label or heading.
fn paragraph_block(text: &str) -> &str {
    let body = text.trim_start_matches([' ', '\t', '\r', '\n']);
    let mut end = body.len();
    for (i, _) in body.match_indices("\n\n") {
        let rest = body[i..].trim_start();
        if rest.starts_with("**") || rest.starts_with('#') {
            end = i;
            break;
        }
    }
    &body[..end]
}

/// Body rows of the first markdown table in `text`, each with at least
/// three cells. The header and separator rows are skipped.
fn table_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut seen_header = false;
    for line in text.lines().map(str::trim) {
        if !line.starts_with('|') {
            if seen_header && !rows.is_empty() {
                break;
            }
            continue;
        }
        if !seen_header {
            seen_header = true;
            continue;
        }
        if line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ')) {
            continue;
        }
        let cells: Vec<String> = line
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect();
        if cells.len() >= 3 {
            rows.push(cells);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FILLED: &str = "\
# turbine - Project Context

## Project State

**Current Phase:** Preliminary design

**Blocking Issues:**

Awaiting turbine wheel datasheet from vendor.

**Next Actions:**

- [ ] Size the combustor liner
- [x] Collect reference papers
- [ ] Run cycle analysis

## Critical Parameters

| Parameter | Value | Source |
|-----------|-------|--------|
| Pressure ratio | 2.8 | Compressor map |
| TIT | 950 C | Material limit |

## System Status

| System | Status | Documentation |
|--------|--------|---------------|
| combustor | Concept complete | docs/systems/combustor |
| fuel-system | Requirements defined | docs/systems/fuel-system |
| structural | Placeholder | - |
| thermal | Not started | - |

## Notes
";

    #[test]
    fn parses_filled_context() {
        let doc = ContextDoc::parse(FILLED);
        assert_eq!(doc.phase, "Preliminary design");
        assert_eq!(doc.blocking, "Awaiting turbine wheel datasheet from vendor.");
        assert!(doc.has_blockers());
        assert_eq!(
            doc.next_actions,
            vec!["Size the combustor liner", "Run cycle analysis"]
        );
        assert_eq!(doc.parameters.len(), 2);
        assert_eq!(doc.parameters[1].name, "TIT");
        assert_eq!(doc.parameters[1].value, "950 C");
        assert_eq!(doc.parameters[1].source, "Material limit");
        assert_eq!(doc.systems.len(), 4);
        assert_eq!(doc.systems[0].documentation, "docs/systems/combustor");
    }

    #[test]
    fn completion_counts_complete_systems() {
        let doc = ContextDoc::parse(FILLED);
        assert_eq!(doc.completed_systems(), 1);
        assert_eq!(doc.in_progress_systems(), 1);
        assert_eq!(doc.completion_percent(), 25);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let doc = ContextDoc::parse("");
        assert_eq!(doc, ContextDoc::default());
        assert!(!doc.has_blockers());
        assert_eq!(doc.completion_percent(), 0);
    }

    #[test]
    fn none_blocker_variants() {
        for text in ["None", "none.", "- None currently", "*None*"] {
            let doc = ContextDoc {
                blocking: text.to_string(),
                ..ContextDoc::default()
            };
            assert!(!doc.has_blockers(), "{text}");
        }
    }

    #[test]
    fn status_badges() {
        assert_eq!(status_class("Concept complete"), StatusClass::Complete);
        assert_eq!(status_class("Research"), StatusClass::Progress);
        assert_eq!(status_class("Basic sizing"), StatusClass::Pending);
        assert_eq!(status_class("Not started"), StatusClass::Blocked);
        assert_eq!(StatusClass::Pending.css_class(), "status-pending");
    }

    #[test]
    fn recent_decisions_newest_first_and_limited() {
        let dir = TempDir::new().unwrap();
        let decisions = dir.path().join("docs/decisions");
        std::fs::create_dir_all(&decisions).unwrap();
        for i in 1..=7 {
            std::fs::write(
                decisions.join(format!("DEC-{i:03}.md")),
                format!("# Decision {i}\n\nBody"),
            )
            .unwrap();
        }
        std::fs::write(decisions.join("README.md"), "# not a decision").unwrap();
        std::fs::write(decisions.join("DEC-008.md"), "no title").unwrap();

        let recent = recent_decisions(dir.path(), 5).unwrap();
        let ids: Vec<_> = recent.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["DEC-008", "DEC-007", "DEC-006", "DEC-005", "DEC-004"]);
        assert_eq!(recent[0].title, "DEC-008");
        assert_eq!(recent[1].title, "Decision 7");
    }

    #[test]
    fn load_missing_context_is_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(ContextDoc::load(dir.path()).unwrap(), ContextDoc::default());
        assert!(recent_decisions(dir.path(), 5).unwrap().is_empty());
    }
}
