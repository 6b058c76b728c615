use crate::error::{EngkitError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ENGKIT_DIR: &str = ".engkit";
pub const CONFIG_FILE: &str = ".engkit/config.yaml";
pub const KNOWLEDGE_DIR: &str = ".engkit/knowledge";

pub const CLAUDE_DIR: &str = ".claude";
pub const CLAUDE_SETTINGS: &str = ".claude/settings.json";
pub const CLAUDE_SETTINGS_LOCAL: &str = ".claude/settings.local.json";

pub const DOCS_DIR: &str = "docs";
pub const REFERENCE_DIR: &str = "docs/reference";
pub const SYSTEMS_DIR: &str = "docs/systems";
pub const DECISIONS_DIR: &str = "docs/decisions";
pub const SCRIPTS_DIR: &str = "scripts";
pub const TEMPLATES_DIR: &str = "templates";
pub const VENV_DIR: &str = ".venv";

pub const CONTEXT_MD: &str = "CONTEXT.md";
pub const CLAUDE_MD: &str = "CLAUDE.md";
pub const WORKFLOW_MD: &str = "WORKFLOW.md";
pub const PROJECT_PARAMS: &str = "project_params.py";
pub const REQUIREMENTS_FILE: &str = "requirements-engineering.txt";
pub const DASHBOARD_FILE: &str = "dashboard.html";
pub const UNDERSTANDING_FILE: &str = "current-understanding.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn knowledge_dir(root: &Path) -> PathBuf {
    root.join(KNOWLEDGE_DIR)
}

pub fn context_md_path(root: &Path) -> PathBuf {
    root.join(CONTEXT_MD)
}

pub fn reference_dir(root: &Path) -> PathBuf {
    root.join(REFERENCE_DIR)
}

pub fn decisions_dir(root: &Path) -> PathBuf {
    root.join(DECISIONS_DIR)
}

pub fn dashboard_path(root: &Path) -> PathBuf {
    root.join(DASHBOARD_FILE)
}

pub fn understanding_path(root: &Path, system: &str) -> PathBuf {
    root.join(SYSTEMS_DIR).join(system).join(UNDERSTANDING_FILE)
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static PROJECT_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn project_name_re() -> &'static Regex {
    PROJECT_NAME_RE.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").unwrap())
}

/// Project names become directory names and git commit subjects, so no
/// spaces or shell-special characters.
pub fn validate_project_name(name: &str) -> Result<()> {
    if !project_name_re().is_match(name) {
        return Err(EngkitError::InvalidProjectName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
