use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use engkit_core::{
    knowledge::{self, Hit, KnowledgeIndex},
    paths,
};
use std::path::{Path, PathBuf};

const PREVIEW_CHARS: usize = 100;

#[derive(Subcommand)]
pub enum KnowledgeSubcommand {
    /// Rebuild the index from the reference documents
    Index {
        /// Documents directory (default: docs/reference)
        #[arg(long)]
        docs: Option<PathBuf>,
    },

    /// Search the index
    Query {
        /// Free-text query
        text: String,

        /// Maximum number of passages to return
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },

    /// Everything the index knows about one system
    System {
        /// System name, e.g. combustor
        system: String,

        /// Narrow the lookup (default: all information)
        aspect: Option<String>,

        /// Maximum number of passages to return
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },
}

pub fn run(root: &Path, subcmd: KnowledgeSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        KnowledgeSubcommand::Index { docs } => index(root, docs.as_deref(), json),
        KnowledgeSubcommand::Query { text, top_k } => query(root, &text, top_k, json),
        KnowledgeSubcommand::System {
            system,
            aspect,
            top_k,
        } => {
            let text = knowledge::system_query(&system, aspect.as_deref());
            query(root, &text, top_k, json)
        }
    }
}

fn index(root: &Path, docs: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let docs_dir = match docs {
        Some(d) if d.is_relative() => root.join(d),
        Some(d) => d.to_path_buf(),
        None => paths::reference_dir(root),
    };
    let report = knowledge::build_index(root, &docs_dir)
        .with_context(|| format!("failed to index {}", docs_dir.display()))?;

    if json {
        return print_json(&report);
    }
    println!(
        "Indexed {} documents ({} passages) from {}",
        report.documents,
        report.passages,
        docs_dir.display()
    );
    if !report.skipped_pdfs.is_empty() {
        println!(
            "Skipped {} PDF file(s); convert them to .md or .txt to index:",
            report.skipped_pdfs.len()
        );
        for name in &report.skipped_pdfs {
            println!("  {name}");
        }
    }
    Ok(())
}

fn query(root: &Path, text: &str, top_k: usize, json: bool) -> anyhow::Result<()> {
    let index = KnowledgeIndex::open(root)?;
    let hits = index.search(text, top_k)?;

    if json {
        return print_json(&hits);
    }
    if hits.is_empty() {
        println!("No matches for: {text}");
        return Ok(());
    }
    println!("Query: {text}\n");
    print_table(&["#", "FILE", "SCORE", "PREVIEW"], rows(&hits));
    Ok(())
}

fn rows(hits: &[Hit]) -> Vec<Vec<String>> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            vec![
                (i + 1).to_string(),
                format!("{}#{}", hit.file, hit.passage),
                format!("{:.3}", hit.score),
                hit.preview(PREVIEW_CHARS),
            ]
        })
        .collect()
}
