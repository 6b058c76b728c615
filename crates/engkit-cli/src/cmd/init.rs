use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use clap::{Args, ValueEnum};
use engkit_core::{
    config::ProjectKind,
    dashboard, knowledge, paths,
    scaffold::{self, ProjectPlan, ScaffoldStep},
    toolkit::{default_description, Replacements, Toolkit},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const TOTAL_STEPS: usize = 7;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProjectType {
    General,
    Mechanical,
    Electrical,
    Thermal,
}

impl From<ProjectType> for ProjectKind {
    fn from(t: ProjectType) -> Self {
        match t {
            ProjectType::General => ProjectKind::General,
            ProjectType::Mechanical => ProjectKind::Mechanical,
            ProjectType::Electrical => ProjectKind::Electrical,
            ProjectType::Thermal => ProjectKind::Thermal,
        }
    }
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Project name (letters, digits, hyphens, underscores; starts with a letter)
    pub name: String,

    /// Target directory (default: $ENGKIT_PROJECTS_DIR/<name>, else ./<name>)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Parent directory for new projects
    #[arg(long, env = "ENGKIT_PROJECTS_DIR", hide_env_values = true)]
    pub projects_dir: Option<PathBuf>,

    /// Project description
    #[arg(long, short)]
    pub description: Option<String>,

    /// Project type
    #[arg(long = "type", short = 't', value_enum, default_value = "general")]
    pub kind: ProjectType,

    /// Create a Python virtual environment and install requirements
    #[arg(long)]
    pub venv: bool,

    /// Build an empty knowledge index
    #[arg(long)]
    pub rag: bool,

    /// Generate an initial dashboard
    #[arg(long)]
    pub dashboard: bool,

    /// Shorthand for --venv --rag --dashboard
    #[arg(long)]
    pub full: bool,

    /// Add a git remote named origin
    #[arg(long)]
    pub git_remote: Option<String>,

    /// Skip git initialization
    #[arg(long)]
    pub no_git: bool,

    /// Show what would be created without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl InitArgs {
    fn target(&self) -> PathBuf {
        match (&self.path, &self.projects_dir) {
            (Some(path), _) => path.clone(),
            (None, Some(dir)) => dir.join(&self.name),
            (None, None) => PathBuf::from(&self.name),
        }
    }
}

#[derive(Debug, Serialize)]
struct InitReport {
    name: String,
    path: PathBuf,
    kind: ProjectKind,
    description: String,
    toolkit_version: String,
    dry_run: bool,
    venv: bool,
    knowledge_index: bool,
    dashboard: Option<PathBuf>,
    git: bool,
    git_remote: Option<String>,
}

pub fn run(args: InitArgs, toolkit: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let kit: Box<dyn Toolkit> = super::load_toolkit(toolkit)?;
    let version = kit.version();
    let description = args
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default_description(&args.name));

    let plan = ProjectPlan {
        name: args.name.clone(),
        target: args.target(),
        description,
        kind: args.kind.into(),
    };
    plan.validate()?;

    let want_venv = args.venv || args.full;
    let want_rag = args.rag || args.full;
    let want_dashboard = args.dashboard || args.full;

    let mut report = InitReport {
        name: plan.name.clone(),
        path: plan.target.clone(),
        kind: plan.kind,
        description: plan.description.clone(),
        toolkit_version: version.clone(),
        dry_run: args.dry_run,
        venv: false,
        knowledge_index: false,
        dashboard: None,
        git: false,
        git_remote: None,
    };

    if args.dry_run {
        if json {
            return print_json(&report);
        }
        print_plan(&plan, &version, want_venv, want_rag, want_dashboard, &args);
        return Ok(());
    }

    let say = |msg: &str| {
        if !json {
            println!("{msg}");
        }
    };

    say(&format!(
        "Initializing {} project '{}' in: {}",
        plan.kind,
        plan.name,
        plan.target.display()
    ));

    let replacements = Replacements::new(
        &plan.name,
        &plan.description,
        plan.kind,
        Utc::now().date_naive(),
        &version,
    );
    scaffold::create_project(kit.as_ref(), &plan, &replacements, |step| {
        let (n, label) = match step {
            ScaffoldStep::ProjectFiles => (1, "Creating project structure..."),
            ScaffoldStep::ClaudeConfig => (2, "Installing .claude/ configuration..."),
            ScaffoldStep::Scripts => (3, "Installing scripts..."),
            ScaffoldStep::Templates => (4, "Installing templates..."),
        };
        say(&format!("[{n}/{TOTAL_STEPS}] {label}"));
    })
    .with_context(|| format!("failed to create project at {}", plan.target.display()))?;

    let target = plan.target.as_path();

    if want_venv {
        say(&format!("[5/{TOTAL_STEPS}] Creating virtual environment..."));
        report.venv = create_venv(target);
    } else {
        say(&format!(
            "[5/{TOTAL_STEPS}] Skipping virtual environment (use --venv to enable)"
        ));
    }

    if want_rag || want_dashboard {
        say(&format!(
            "[6/{TOTAL_STEPS}] Building knowledge index and dashboard..."
        ));
    } else {
        say(&format!(
            "[6/{TOTAL_STEPS}] Skipping knowledge index and dashboard (use --rag / --dashboard)"
        ));
    }
    if want_rag {
        knowledge::build_index(target, &paths::reference_dir(target))
            .context("failed to build knowledge index")?;
        report.knowledge_index = true;
        say("      Empty knowledge index created. Add documents to docs/reference/ then run:");
        say("      engkit knowledge index");
    }
    if want_dashboard {
        let summary = dashboard::write_dashboard(target, None, Utc::now())
            .context("failed to generate dashboard")?;
        report.dashboard = Some(summary.path);
    }

    if args.no_git {
        say(&format!("[7/{TOTAL_STEPS}] Skipping git (--no-git)"));
    } else {
        say(&format!("[7/{TOTAL_STEPS}] Initializing git repository..."));
        let message = format!("[INIT] {} project from toolkit v{}", plan.name, version);
        report.git = init_git(target, &message);
        if report.git {
            if let Some(remote) = &args.git_remote {
                if run_quiet(target, "git", &["remote", "add", "origin", remote]) {
                    say(&format!("      Remote added: {remote}"));
                    report.git_remote = Some(remote.clone());
                } else {
                    eprintln!("  warning: failed to add git remote {remote}");
                }
            }
        }
    }

    if json {
        return print_json(&report);
    }
    print_checklist(&plan, &version);
    Ok(())
}

fn print_plan(
    plan: &ProjectPlan,
    version: &str,
    venv: bool,
    rag: bool,
    dashboard: bool,
    args: &InitArgs,
) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    println!("DRY RUN: nothing will be written");
    println!();
    println!("  name:            {}", plan.name);
    println!("  path:            {}", plan.target.display());
    println!("  type:            {}", plan.kind);
    println!("  description:     {}", plan.description);
    println!("  toolkit version: {version}");
    println!("  venv:            {}", yes_no(venv));
    println!("  knowledge index: {}", yes_no(rag));
    println!("  dashboard:       {}", yes_no(dashboard));
    println!("  git:             {}", yes_no(!args.no_git));
    if let Some(remote) = &args.git_remote {
        println!("  git remote:      {remote}");
    }
}

/// `python3 -m venv .venv` then `pip install -r requirements-engineering.txt`.
/// Failures are reported and skipped; the project is already usable.
fn create_venv(target: &Path) -> bool {
    let Some(python) = ["python3", "python"]
        .iter()
        .find_map(|name| which::which(name).ok())
    else {
        eprintln!("  warning: python3 not found on PATH, skipping virtual environment");
        return false;
    };

    let venv = target.join(paths::VENV_DIR);
    let created = Command::new(&python)
        .args(["-m", "venv"])
        .arg(&venv)
        .current_dir(target)
        .stdout(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !created {
        eprintln!("  warning: failed to create virtual environment");
        return false;
    }

    let pip = if cfg!(windows) {
        venv.join("Scripts").join("pip.exe")
    } else {
        venv.join("bin").join("pip")
    };
    let requirements = target.join(paths::REQUIREMENTS_FILE);
    if requirements.exists() {
        let installed = Command::new(&pip)
            .args(["install", "-r"])
            .arg(&requirements)
            .current_dir(target)
            .stdout(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !installed {
            eprintln!("  warning: pip install failed; run it manually inside .venv");
        }
    }
    true
}

fn init_git(target: &Path, message: &str) -> bool {
    if which::which("git").is_err() {
        eprintln!("  warning: git not found on PATH, skipping repository setup");
        return false;
    }
    if !run_quiet(target, "git", &["init"]) || !run_quiet(target, "git", &["add", "-A"]) {
        eprintln!("  warning: git init failed");
        return false;
    }
    if !run_quiet(target, "git", &["commit", "-m", message]) {
        eprintln!("  warning: initial commit failed (is git user.name/user.email set?)");
    }
    true
}

fn run_quiet(dir: &Path, program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or_else(|e| {
            tracing::debug!(program, error = %e, "failed to spawn");
            false
        })
}

fn print_checklist(plan: &ProjectPlan, version: &str) {
    let rule = "=".repeat(80);
    println!();
    println!("{rule}");
    println!(" PROJECT INITIALIZED: {}", plan.name);
    println!(" Location: {}", plan.target.display());
    println!(" Toolkit Version: {version}");
    println!("{rule}");
    println!();
    println!(" GETTING STARTED CHECKLIST");
    println!(" -------------------------");
    println!(" [ ] 1. Open the project in your editor:");
    println!("        code \"{}\"", plan.target.display());
    println!();
    println!(" [ ] 2. Read workflow documentation:");
    println!("        - WORKFLOW.md (daily workflow)");
    println!("        - .claude/README.md (hook system)");
    println!();
    println!(" [ ] 3. Customize project_params.py with your parameters");
    println!();
    println!(" [ ] 4. Add reference documents to docs/reference/, then:");
    println!("        engkit knowledge index");
    println!();
    println!(" [ ] 5. Update CONTEXT.md with project state");
    println!();
    println!(" [ ] 6. Run /prime in the assistant to orient yourself");
    println!();
    println!(" KEY COMMANDS");
    println!(" ------------");
    println!(" /prime              - Read essential project context");
    println!(" /understand [sys]   - Research before designing");
    println!(" /research [topic]   - Search and document");
    println!(" /decision [title]   - Create decision record");
    println!(" engkit verify       - Check project structure");
    println!(" engkit dashboard    - Render dashboard.html");
    println!("{rule}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: InitArgs,
    }

    fn parse(argv: &[&str]) -> InitArgs {
        let mut full = vec!["init"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn explicit_path_wins_over_projects_dir() {
        let args = parse(&["pump", "--path", "/tmp/x/pump-a", "--projects-dir", "/srv"]);
        assert_eq!(args.target(), PathBuf::from("/tmp/x/pump-a"));
    }

    #[test]
    fn projects_dir_joins_name() {
        let args = parse(&["pump", "--projects-dir", "/srv/projects"]);
        assert_eq!(args.target(), PathBuf::from("/srv/projects/pump"));
    }

    #[test]
    fn type_maps_to_project_kind() {
        let args = parse(&["motor", "-t", "electrical"]);
        assert_eq!(ProjectKind::from(args.kind), ProjectKind::Electrical);
        let args = parse(&["motor"]);
        assert_eq!(ProjectKind::from(args.kind), ProjectKind::General);
    }
}
