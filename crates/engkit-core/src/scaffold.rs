//! Filesystem side of `engkit init` and `engkit update`: installing toolkit
//! sections into a project and refreshing the toolkit-managed parts of an
//! existing one.

use crate::config::{Config, ProjectKind};
use crate::error::{EngkitError, Result};
use crate::io;
use crate::paths;
use crate::toolkit::{
    Replacements, Toolkit, CLAUDE_SECTION, REQUIREMENTS_ASSET, SCAFFOLD_SECTION, SCRIPTS_SECTION,
    TEMPLATES_SECTION,
};
use std::path::{Path, PathBuf};

/// `.claude/` subdirectories owned by the toolkit and replaced on update.
pub const MANAGED_CLAUDE_DIRS: &[&str] = &["hooks", "commands", "agents", "skills"];

/// Top-level `.claude/` files refreshed on update.
pub const MANAGED_CLAUDE_FILES: &[&str] = &["settings.json", "README.md"];

const SETTINGS_LOCAL: &str = "settings.local.json";

// ---------------------------------------------------------------------------
// Installing sections
// ---------------------------------------------------------------------------

/// Render every asset of `section` into `dest`. Returns the number of files written.
pub fn install_section(
    kit: &dyn Toolkit,
    section: &str,
    dest: &Path,
    replacements: &Replacements,
) -> Result<usize> {
    install_filtered(kit, section, dest, replacements, |_| true)
}

fn install_filtered(
    kit: &dyn Toolkit,
    section: &str,
    dest: &Path,
    replacements: &Replacements,
    keep: impl Fn(&Path) -> bool,
) -> Result<usize> {
    let mut written = 0;
    for asset in kit.section(section)? {
        let rel = asset.output_path();
        if !keep(&rel) {
            continue;
        }
        let data = asset.render(replacements)?;
        io::atomic_write(&dest.join(&rel), &data)?;
        written += 1;
    }
    Ok(written)
}

/// Copy `requirements-engineering.txt` into the project if the toolkit has one.
pub fn install_requirements(kit: &dyn Toolkit, project: &Path) -> Result<bool> {
    match kit.file(REQUIREMENTS_ASSET)? {
        Some(data) => {
            io::atomic_write(&project.join(paths::REQUIREMENTS_FILE), &data)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// New projects
// ---------------------------------------------------------------------------

/// Everything `engkit init` needs to lay down a new project tree.
#[derive(Debug, Clone)]
pub struct ProjectPlan {
    pub name: String,
    pub target: PathBuf,
    pub description: String,
    pub kind: ProjectKind,
}

impl ProjectPlan {
    pub fn validate(&self) -> Result<()> {
        paths::validate_project_name(&self.name)?;
        if self.target.exists() {
            return Err(EngkitError::TargetExists(self.target.clone()));
        }
        Ok(())
    }
}

/// Steps reported back to the caller as they complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaffoldStep {
    ProjectFiles,
    ClaudeConfig,
    Scripts,
    Templates,
}

/// Copy the toolkit into a fresh project directory and write its config.
///
/// `on_step` is called before each section is installed so the caller can
/// report progress.
pub fn create_project(
    kit: &dyn Toolkit,
    plan: &ProjectPlan,
    replacements: &Replacements,
    mut on_step: impl FnMut(ScaffoldStep),
) -> Result<()> {
    plan.validate()?;
    io::ensure_dir(&plan.target)?;

    on_step(ScaffoldStep::ProjectFiles);
    install_section(kit, SCAFFOLD_SECTION, &plan.target, replacements)?;

    on_step(ScaffoldStep::ClaudeConfig);
    install_section(
        kit,
        CLAUDE_SECTION,
        &plan.target.join(paths::CLAUDE_DIR),
        replacements,
    )?;

    on_step(ScaffoldStep::Scripts);
    install_section(
        kit,
        SCRIPTS_SECTION,
        &plan.target.join(paths::SCRIPTS_DIR),
        replacements,
    )?;

    on_step(ScaffoldStep::Templates);
    install_section(
        kit,
        TEMPLATES_SECTION,
        &plan.target.join(paths::TEMPLATES_DIR),
        replacements,
    )?;

    install_requirements(kit, &plan.target)?;

    let mut config = Config::new(&plan.name);
    config.project.description = Some(plan.description.clone());
    config.project.kind = plan.kind;
    config.toolkit_version = Some(kit.version());
    config.save(&plan.target)?;

    tracing::debug!(target = %plan.target.display(), "project scaffold written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Updating projects
// ---------------------------------------------------------------------------

/// Outcome of refreshing `.claude/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaudeRefresh {
    pub files_written: usize,
    pub kept_local_settings: bool,
    pub installed_local_settings: bool,
}

/// Replace the toolkit-managed parts of `.claude/`, keeping user settings.
pub fn refresh_claude(
    kit: &dyn Toolkit,
    project: &Path,
    replacements: &Replacements,
) -> Result<ClaudeRefresh> {
    let claude = project.join(paths::CLAUDE_DIR);
    let local_path = claude.join(SETTINGS_LOCAL);
    let local = io::read_optional(&local_path);

    for dir in MANAGED_CLAUDE_DIRS {
        io::remove_dir_if_exists(&claude.join(dir))?;
    }

    let files_written = install_filtered(kit, CLAUDE_SECTION, &claude, replacements, |rel| {
        let first = first_segment(rel);
        MANAGED_CLAUDE_DIRS.contains(&first.as_str())
            || MANAGED_CLAUDE_FILES.contains(&first.as_str())
    })?;

    let mut refresh = ClaudeRefresh {
        files_written,
        ..Default::default()
    };

    match local {
        Some(existing) => {
            io::atomic_write(&local_path, existing.as_bytes())?;
            refresh.kept_local_settings = true;
        }
        None => {
            let installed =
                install_filtered(kit, CLAUDE_SECTION, &claude, replacements, |rel| {
                    rel == Path::new(SETTINGS_LOCAL)
                })?;
            refresh.installed_local_settings = installed > 0;
        }
    }

    Ok(refresh)
}

/// Replace toolkit scripts in `scripts/`. Entries the toolkit does not ship
/// are left in place and returned by name.
pub fn refresh_scripts(
    kit: &dyn Toolkit,
    project: &Path,
    replacements: &Replacements,
) -> Result<Vec<String>> {
    let dest = project.join(paths::SCRIPTS_DIR);
    let owned = kit.top_level_names(SCRIPTS_SECTION)?;

    let mut preserved = Vec::new();
    if dest.is_dir() {
        for entry in std::fs::read_dir(&dest)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if owned.contains(&name) {
                let path = entry.path();
                if path.is_dir() {
                    std::fs::remove_dir_all(&path)?;
                } else {
                    std::fs::remove_file(&path)?;
                }
            } else {
                preserved.push(name);
            }
        }
    }
    preserved.sort();

    install_section(kit, SCRIPTS_SECTION, &dest, replacements)?;
    Ok(preserved)
}

/// Replace `templates/` wholesale.
pub fn refresh_templates(
    kit: &dyn Toolkit,
    project: &Path,
    replacements: &Replacements,
) -> Result<usize> {
    let dest = project.join(paths::TEMPLATES_DIR);
    io::remove_dir_if_exists(&dest)?;
    install_section(kit, TEMPLATES_SECTION, &dest, replacements)
}

/// Record `version` as the project's toolkit version, creating a config
/// for projects that predate one. Returns the previous version, if any.
pub fn stamp_toolkit_version(project: &Path, version: &str) -> Result<Option<String>> {
    let mut config = match Config::load(project) {
        Ok(cfg) => cfg,
        Err(EngkitError::NotAProject(_)) => Config::new(project_name_from_dir(project)),
        Err(e) => return Err(e),
    };
    let previous = config.toolkit_version.take();
    config.toolkit_version = Some(version.to_string());
    config.save(project)?;
    Ok(previous)
}

/// Fallback project name for projects without a config.
pub fn project_name_from_dir(project: &Path) -> String {
    project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

fn first_segment(rel: &Path) -> String {
    rel.components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
