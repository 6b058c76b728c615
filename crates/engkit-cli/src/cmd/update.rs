use crate::output::print_json;
use anyhow::{bail, Context};
use chrono::Utc;
use engkit_core::{
    config::Config,
    paths,
    scaffold::{self, MANAGED_CLAUDE_DIRS, MANAGED_CLAUDE_FILES},
    toolkit::{default_description, Replacements, Toolkit},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Serialize)]
struct UpdateReport {
    path: PathBuf,
    previous_version: String,
    toolkit_version: String,
    up_to_date: bool,
    dry_run: bool,
    claude_files: usize,
    kept_local_settings: bool,
    preserved_scripts: Vec<String>,
    templates: usize,
    requirements: bool,
}

pub fn run(
    project: &Path,
    toolkit: Option<&Path>,
    force: bool,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    if !project.is_dir() {
        bail!("project directory not found: {}", project.display());
    }
    if !paths::context_md_path(project).exists() {
        bail!(
            "{} is not an engineering project (no {} found)",
            project.display(),
            paths::CONTEXT_MD
        );
    }

    let kit: Box<dyn Toolkit> = super::load_toolkit(toolkit)?;
    let version = kit.version();
    let config = Config::load(project).ok();
    let previous = config
        .as_ref()
        .and_then(|c| c.toolkit_version.clone())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

    let mut report = UpdateReport {
        path: project.to_path_buf(),
        previous_version: previous.clone(),
        toolkit_version: version.clone(),
        up_to_date: previous == version,
        dry_run,
        claude_files: 0,
        kept_local_settings: false,
        preserved_scripts: Vec::new(),
        templates: 0,
        requirements: false,
    };

    if report.up_to_date && !force {
        if json {
            return print_json(&report);
        }
        println!("Project is already up to date (toolkit v{version}).");
        println!("Use --force to update anyway.");
        return Ok(());
    }

    if dry_run {
        if json {
            return print_json(&report);
        }
        println!("DRY RUN: would update {}", project.display());
        println!("  toolkit: v{previous} -> v{version}");
        for dir in MANAGED_CLAUDE_DIRS {
            println!("  replace: .claude/{dir}/");
        }
        for file in MANAGED_CLAUDE_FILES {
            println!("  refresh: .claude/{file}");
        }
        println!("  keep:    .claude/settings.local.json (if present)");
        println!("  replace: scripts/ (non-toolkit files preserved)");
        println!("  replace: templates/");
        println!("  refresh: {}", paths::REQUIREMENTS_FILE);
        return Ok(());
    }

    let (name, description, kind) = match &config {
        Some(cfg) => (
            cfg.project.name.clone(),
            cfg.project
                .description
                .clone()
                .unwrap_or_else(|| default_description(&cfg.project.name)),
            cfg.project.kind,
        ),
        None => {
            let name = scaffold::project_name_from_dir(project);
            let description = default_description(&name);
            (name, description, Default::default())
        }
    };
    let replacements = Replacements::new(
        &name,
        &description,
        kind,
        Utc::now().date_naive(),
        &version,
    );

    if !json {
        println!("Updating {} from v{previous} to v{version}", project.display());
    }

    let claude = scaffold::refresh_claude(kit.as_ref(), project, &replacements)
        .context("failed to refresh .claude/")?;
    report.claude_files = claude.files_written;
    report.kept_local_settings = claude.kept_local_settings;

    report.preserved_scripts = scaffold::refresh_scripts(kit.as_ref(), project, &replacements)
        .context("failed to refresh scripts/")?;
    report.templates = scaffold::refresh_templates(kit.as_ref(), project, &replacements)
        .context("failed to refresh templates/")?;
    report.requirements = scaffold::install_requirements(kit.as_ref(), project)
        .with_context(|| format!("failed to refresh {}", paths::REQUIREMENTS_FILE))?;

    scaffold::stamp_toolkit_version(project, &version)
        .context("failed to record toolkit version")?;

    if json {
        return print_json(&report);
    }

    println!("  updated: .claude/ ({} files)", report.claude_files);
    if report.kept_local_settings {
        println!("  kept:    .claude/settings.local.json");
    } else if claude.installed_local_settings {
        println!("  created: .claude/settings.local.json");
    }
    println!("  updated: scripts/");
    for name in &report.preserved_scripts {
        println!("  kept:    scripts/{name}");
    }
    println!("  updated: templates/ ({} files)", report.templates);
    if report.requirements {
        println!("  updated: {}", paths::REQUIREMENTS_FILE);
    }
    println!("  stamped: {} (toolkit_version {previous} -> {version})", paths::CONFIG_FILE);
    println!();
    println!("Update complete. Project content, CONTEXT.md, CLAUDE.md and WORKFLOW.md were not touched.");
    Ok(())
}
