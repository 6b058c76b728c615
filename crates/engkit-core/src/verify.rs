//! Structural verification of a project against the toolkit layout.

use crate::config::{Config, WarnLevel};
use crate::error::{EngkitError, Result};
use crate::hooks::HookKind;
use crate::knowledge;
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const REQUIRED_DIRS: &[&str] = &[
    ".claude",
    "calculations",
    "design",
    "docs",
    "manufacturing",
    "scripts",
    "templates",
    "testing",
    "verification",
];

pub const REQUIRED_FILES: &[&str] = &[
    "CONTEXT.md",
    "CLAUDE.md",
    "WORKFLOW.md",
    "project_params.py",
    ".gitignore",
];

pub const CONTEXT_SECTIONS: &[&str] = &["Project State", "Critical Parameters", "System Status"];

pub const REQUIRED_COMMANDS: &[&str] = &["decision", "prime", "research", "understand", "verify-calc"];

pub const REQUIRED_AGENTS: &[&str] = &[
    "doc-specialist",
    "knowledge-builder",
    "systematic-engineer",
    "memory-ingest",
    "memory-search",
];

pub const REQUIRED_SKILL: &str = "skills/SKILL.md";

pub const REQUIRED_SKILL_TEMPLATES: &[&str] = &[
    "CONTEXT.md",
    "decision-template.md",
    "reference-template.md",
    "sources-template.md",
    "TODO.md",
    "workspace-structure.md",
];

pub const MIN_TEMPLATES: usize = 6;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckLevel {
    Pass,
    Warn,
    Fail,
    Info,
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub level: CheckLevel,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub name: String,
    pub checks: Vec<Check>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    pub fn count(&self, level: CheckLevel) -> usize {
        self.checks.iter().filter(|c| c.level == level).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Valid,
    ValidWithWarnings,
    Invalid,
    InvalidStrict,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Valid => "VALID",
            Status::ValidWithWarnings => "VALID (with warnings)",
            Status::Invalid => "INVALID",
            Status::InvalidStrict => "INVALID (strict mode)",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Status::Valid | Status::ValidWithWarnings => 0,
            Status::Invalid => 1,
            Status::InvalidStrict => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub path: PathBuf,
    pub strict: bool,
    pub sections: Vec<Section>,
    pub passes: usize,
    pub warnings: usize,
    pub errors: usize,
    pub status: Status,
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Run every check against the project at `root`.
pub fn verify(root: &Path, strict: bool) -> Result<Report> {
    if !root.is_dir() {
        return Err(EngkitError::PathNotFound(root.to_path_buf()));
    }
    let sections = vec![
        structure(root),
        core_files(root),
        context_md(root),
        claude_config(root),
        project_config(root),
        templates(root),
        git(root),
        optional(root),
    ];

    let total = |level| sections.iter().map(|s| s.count(level)).sum::<usize>();
    let passes = total(CheckLevel::Pass);
    let warnings = total(CheckLevel::Warn);
    let errors = total(CheckLevel::Fail);

    let status = if errors > 0 {
        Status::Invalid
    } else if warnings > 0 && strict {
        Status::InvalidStrict
    } else if warnings > 0 {
        Status::ValidWithWarnings
    } else {
        Status::Valid
    };
    tracing::debug!(passes, warnings, errors, "verification finished");

    Ok(Report {
        path: root.to_path_buf(),
        strict,
        sections,
        passes,
        warnings,
        errors,
        status,
    })
}

impl Section {
    fn record(&mut self, ok: bool, pass: impl Into<String>, fail: impl Into<String>) -> bool {
        let (level, message) = if ok {
            (CheckLevel::Pass, pass.into())
        } else {
            (CheckLevel::Fail, fail.into())
        };
        self.checks.push(Check { level, message });
        ok
    }

    fn warn_unless(&mut self, ok: bool, pass: impl Into<String>, warn: impl Into<String>) -> bool {
        let (level, message) = if ok {
            (CheckLevel::Pass, pass.into())
        } else {
            (CheckLevel::Warn, warn.into())
        };
        self.checks.push(Check { level, message });
        ok
    }

    fn info(&mut self, message: impl Into<String>) {
        self.checks.push(Check {
            level: CheckLevel::Info,
            message: message.into(),
        });
    }
}

fn structure(root: &Path) -> Section {
    let mut s = Section::new("Structure");
    for dir in REQUIRED_DIRS {
        s.record(
            root.join(dir).is_dir(),
            format!("Directory: {dir}"),
            format!("Missing directory: {dir}"),
        );
    }
    s
}

fn core_files(root: &Path) -> Section {
    let mut s = Section::new("Core Files");
    for file in REQUIRED_FILES {
        s.record(
            root.join(file).is_file(),
            format!("File: {file}"),
            format!("Missing file: {file}"),
        );
    }
    s
}

fn context_md(root: &Path) -> Section {
    let mut s = Section::new("CONTEXT.md");
    let content = match std::fs::read_to_string(paths::context_md_path(root)) {
        Ok(c) => c,
        Err(_) => {
            s.record(false, "", "CONTEXT.md not found");
            return s;
        }
    };
    for section in CONTEXT_SECTIONS {
        s.record(
            content.contains(section),
            format!("Section: {section}"),
            format!("Missing section: {section}"),
        );
    }
    s
}

fn json_file(s: &mut Section, path: &Path, label: &str) -> Option<serde_json::Value> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(_) => {
            s.record(false, "", format!("{label} not found"));
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(v) => {
            s.record(true, format!("{label} is valid JSON"), "");
            Some(v)
        }
        Err(e) => {
            s.record(false, "", format!("{label} is invalid JSON: {e}"));
            None
        }
    }
}

/// Every `"command"` string anywhere in a settings document.
fn hook_commands(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                match (k.as_str(), v) {
                    ("command", serde_json::Value::String(cmd)) => out.push(cmd.clone()),
                    _ => hook_commands(v, out),
                }
            }
        }
        serde_json::Value::Array(items) => items.iter().for_each(|v| hook_commands(v, out)),
        _ => {}
    }
}

fn claude_config(root: &Path) -> Section {
    let mut s = Section::new("Claude Configuration");
    let claude = root.join(paths::CLAUDE_DIR);

    if let Some(settings) = json_file(&mut s, &root.join(paths::CLAUDE_SETTINGS), "settings.json") {
        let mut commands = Vec::new();
        hook_commands(&settings, &mut commands);
        for kind in HookKind::ALL {
            let needle = format!("engkit hook {}", kind.as_str());
            s.record(
                commands.iter().any(|c| c.contains(&needle)),
                format!("Hook registered: {kind}"),
                format!("Hook not registered in settings.json: {kind}"),
            );
        }
    }
    json_file(
        &mut s,
        &root.join(paths::CLAUDE_SETTINGS_LOCAL),
        "settings.local.json",
    );

    for cmd in REQUIRED_COMMANDS {
        s.record(
            claude.join("commands").join(format!("{cmd}.md")).is_file(),
            format!("Command: /{cmd}"),
            format!("Missing command: {cmd}.md"),
        );
    }
    for agent in REQUIRED_AGENTS {
        s.record(
            claude.join("agents").join(format!("{agent}.md")).is_file(),
            format!("Agent: {agent}"),
            format!("Missing agent: {agent}.md"),
        );
    }
    s.record(
        claude.join(REQUIRED_SKILL).is_file(),
        format!("Skill: {REQUIRED_SKILL}"),
        format!("Missing skill file: {REQUIRED_SKILL}"),
    );
    for template in REQUIRED_SKILL_TEMPLATES {
        s.record(
            claude.join("skills/templates").join(template).is_file(),
            format!("Skill template: {template}"),
            format!("Missing skill template: skills/templates/{template}"),
        );
    }
    s
}

fn project_config(root: &Path) -> Section {
    let mut s = Section::new("Project Config");
    match Config::load(root) {
        Ok(cfg) => {
            s.record(true, format!("{} parses", paths::CONFIG_FILE), "");
            for w in cfg.validate() {
                match w.level {
                    WarnLevel::Error => s.record(false, "", w.message),
                    WarnLevel::Warning => s.warn_unless(false, "", w.message),
                };
            }
        }
        Err(EngkitError::NotAProject(_)) => {
            s.record(false, "", format!("Missing {}", paths::CONFIG_FILE));
        }
        Err(e) => {
            s.record(false, "", format!("{} is invalid: {e}", paths::CONFIG_FILE));
        }
    }
    s
}

fn templates(root: &Path) -> Section {
    let mut s = Section::new("Templates");
    let dir = root.join(paths::TEMPLATES_DIR);
    let count = std::fs::read_dir(&dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.is_file()
                        && matches!(
                            p.extension().and_then(|e| e.to_str()),
                            Some("md") | Some("ipynb")
                        )
                })
                .count()
        })
        .unwrap_or(0);
    s.record(
        count >= MIN_TEMPLATES,
        format!("{count} templates found"),
        format!("Expected at least {MIN_TEMPLATES} templates, found {count}"),
    );
    s
}

fn git(root: &Path) -> Section {
    let mut s = Section::new("Git");
    if !s.warn_unless(
        root.join(".git").exists(),
        "Git repository present",
        "Not a git repository",
    ) {
        return s;
    }
    let head = std::process::Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["rev-parse", "--verify", "--quiet", "HEAD"])
        .output();
    match head {
        Ok(out) => {
            s.warn_unless(
                out.status.success(),
                "Git repository has commits",
                "Git repository has no commits",
            );
        }
        Err(e) => {
            tracing::debug!(error = %e, "git not runnable");
            s.warn_unless(false, "", "Git not available to verify commits");
        }
    }
    s
}

fn optional(root: &Path) -> Section {
    let mut s = Section::new("Optional Components");
    s.info(match knowledge::last_report(root) {
        Some(r) if knowledge::index_exists(root) => format!(
            "Knowledge index present ({} documents, {} passages, built {})",
            r.documents,
            r.passages,
            r.indexed_at.format("%Y-%m-%d %H:%M UTC")
        ),
        _ if knowledge::index_exists(root) => "Knowledge index present".to_string(),
        _ => "Knowledge index not built".to_string(),
    });
    s.info(if root.join(paths::VENV_DIR).is_dir() {
        "Virtual environment present"
    } else {
        "Virtual environment not created"
    });
    s.info(if paths::dashboard_path(root).is_file() {
        "Dashboard generated"
    } else {
        "Dashboard not generated"
    });
    s
}
