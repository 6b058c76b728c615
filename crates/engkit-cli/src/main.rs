mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{init::InitArgs, knowledge::KnowledgeSubcommand};
use engkit_core::hooks::HookKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "engkit",
    about = "Engineering project toolkit: scaffold projects, verify them, and enforce documentation-first work through assistant hooks",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .engkit/ or .git/)
    #[arg(long, global = true, env = "ENGKIT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Use an on-disk toolkit tree instead of the embedded one
    #[arg(long, global = true, env = "ENGKIT_TOOLKIT_DIR")]
    toolkit: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new engineering project from the toolkit
    Init(InitArgs),

    /// Refresh toolkit-managed files in an existing project
    Update {
        /// Project directory
        path: PathBuf,

        /// Update even when the project is already on this toolkit version
        #[arg(long)]
        force: bool,

        /// Show what would be replaced without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check a project's structure and tooling
    Verify {
        /// Project directory (default: the project root)
        path: Option<PathBuf>,

        /// Treat warnings as errors (exit 2)
        #[arg(long)]
        strict: bool,
    },

    /// Render the HTML status dashboard from CONTEXT.md
    Dashboard {
        /// Output file; relative paths resolve against the project root (default: dashboard.html)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Open the dashboard in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Build and search the reference-document index
    Knowledge {
        #[command(subcommand)]
        subcommand: KnowledgeSubcommand,
    },

    /// Run a policy hook (reads the host event JSON on stdin)
    Hook {
        /// context-update | doc-before-design | context-before-work | bash-safety
        name: HookKind,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let toolkit = cli.toolkit.as_deref();
    let project_root = || root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init(args) => cmd::init::run(args, toolkit, cli.json).map(|_| 0),
        Commands::Update {
            path,
            force,
            dry_run,
        } => cmd::update::run(&path, toolkit, force, dry_run, cli.json).map(|_| 0),
        Commands::Verify { path, strict } => {
            let path = path.unwrap_or_else(project_root);
            cmd::verify::run(&path, strict, cli.json)
        }
        Commands::Dashboard { output, open } => {
            cmd::dashboard::run(&project_root(), output.as_deref(), open, cli.json).map(|_| 0)
        }
        Commands::Knowledge { subcommand } => {
            cmd::knowledge::run(&project_root(), subcommand, cli.json).map(|_| 0)
        }
        Commands::Hook { name } => Ok(cmd::hook::run(name)),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
