//! Lexical retrieval over the project's reference documents.
//!
//! Markdown and text documents are split into paragraph passages and stored
//! in an on-disk BM25 index under `.engkit/knowledge/index/`. PDFs are
//! counted but not read.

use crate::error::{EngkitError, Result};
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tantivy::{
    collector::TopDocs,
    query::QueryParser,
    schema::{Field, Schema, Value, STORED, STRING, TEXT},
    Index, IndexWriter, ReloadPolicy, TantivyDocument,
};

const INDEX_SUBDIR: &str = "index";
const MANIFEST_FILE: &str = "manifest.json";
const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];
const PDF_EXTENSION: &str = "pdf";

/// Paragraphs shorter than this are merged with the next one.
const MIN_PASSAGE_CHARS: usize = 200;
const MAX_PASSAGE_CHARS: usize = 2000;

pub const DEFAULT_ASPECT: &str = "all information";

fn knowledge_err(e: tantivy::TantivyError) -> EngkitError {
    EngkitError::Knowledge(e.to_string())
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexReport {
    pub docs_dir: PathBuf,
    pub documents: usize,
    pub passages: usize,
    pub skipped_pdfs: Vec<String>,
    pub indexed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub file: String,
    pub passage: u64,
    pub score: f32,
    pub text: String,
}

impl Hit {
    /// The first `max_chars` characters of the passage on one line.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            return flat;
        }
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

struct Fields {
    file: Field,
    passage: Field,
    text: Field,
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let file = builder.add_text_field("file", STRING | STORED);
    let passage = builder.add_u64_field("passage", STORED);
    let text = builder.add_text_field("text", TEXT | STORED);
    (builder.build(), Fields { file, passage, text })
}

fn fields_of(schema: &Schema) -> Result<Fields> {
    let get = |name: &str| schema.get_field(name).map_err(knowledge_err);
    Ok(Fields {
        file: get("file")?,
        passage: get("passage")?,
        text: get("text")?,
    })
}

pub fn index_dir(root: &Path) -> PathBuf {
    paths::knowledge_dir(root).join(INDEX_SUBDIR)
}

pub fn manifest_path(root: &Path) -> PathBuf {
    paths::knowledge_dir(root).join(MANIFEST_FILE)
}

/// True when an index has been built for `root`.
pub fn index_exists(root: &Path) -> bool {
    index_dir(root).join("meta.json").is_file()
}

/// The manifest written by the last successful build, if any.
pub fn last_report(root: &Path) -> Option<IndexReport> {
    let data = io::read_optional(&manifest_path(root))?;
    serde_json::from_str(&data).ok()
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Rebuild the index from scratch from every text document under `docs_dir`.
pub fn build_index(root: &Path, docs_dir: &Path) -> Result<IndexReport> {
    let dir = index_dir(root);
    io::remove_dir_if_exists(&dir)?;
    io::ensure_dir(&dir)?;

    let (schema, fields) = build_schema();
    let index = Index::create_in_dir(&dir, schema).map_err(knowledge_err)?;
    let mut writer: IndexWriter = index.writer(15_000_000).map_err(knowledge_err)?;

    let mut documents = 0;
    let mut passages = 0;
    for path in io::files_with_extensions(docs_dir, TEXT_EXTENSIONS)? {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document");
                continue;
            }
        };
        let name = relative_name(docs_dir, &path);
        for (i, passage) in split_passages(&content).into_iter().enumerate() {
            let mut doc = TantivyDocument::default();
            doc.add_text(fields.file, &name);
            doc.add_u64(fields.passage, i as u64);
            doc.add_text(fields.text, &passage);
            writer.add_document(doc).map_err(knowledge_err)?;
            passages += 1;
        }
        documents += 1;
        tracing::debug!(file = %name, "indexed");
    }
    writer.commit().map_err(knowledge_err)?;

    let skipped_pdfs = io::files_with_extensions(docs_dir, &[PDF_EXTENSION])?
        .iter()
        .map(|p| relative_name(docs_dir, p))
        .collect();

    let report = IndexReport {
        docs_dir: docs_dir.to_path_buf(),
        documents,
        passages,
        skipped_pdfs,
        indexed_at: chrono::Utc::now(),
    };
    io::atomic_write(
        &manifest_path(root),
        serde_json::to_string_pretty(&report)?.as_bytes(),
    )?;
    Ok(report)
}

fn relative_name(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Blank-line separated paragraphs, with short runs merged so a passage
/// carries enough text to rank, and long ones split at line breaks.
pub fn split_passages(content: &str) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current = String::new();

    for para in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(para);
        if current.chars().count() >= MIN_PASSAGE_CHARS {
            flush(&mut current, &mut passages);
        }
    }
    if !current.trim().is_empty() {
        flush(&mut current, &mut passages);
    }
    passages
}

fn flush(current: &mut String, passages: &mut Vec<String>) {
    let text = std::mem::take(current);
    if text.chars().count() <= MAX_PASSAGE_CHARS {
        passages.push(text);
        return;
    }
    let mut piece = String::new();
    for line in text.lines() {
        if !piece.is_empty() && piece.chars().count() + line.chars().count() > MAX_PASSAGE_CHARS {
            passages.push(std::mem::take(&mut piece));
        }
        if !piece.is_empty() {
            piece.push('\n');
        }
        piece.push_str(line);
    }
    if !piece.trim().is_empty() {
        passages.push(piece);
    }
}

// ---------------------------------------------------------------------------
// Querying
// ---------------------------------------------------------------------------

pub struct KnowledgeIndex {
    index: Index,
    reader: tantivy::IndexReader,
    fields: Fields,
}

impl KnowledgeIndex {
    pub fn open(root: &Path) -> Result<Self> {
        if !index_exists(root) {
            return Err(EngkitError::KnowledgeIndexMissing);
        }
        let index = Index::open_in_dir(index_dir(root)).map_err(knowledge_err)?;
        let fields = fields_of(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(knowledge_err)?;
        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    /// BM25 search; any term may match. Returns at most `top_k` hits, best first.
    pub fn search(&self, text: &str, top_k: usize) -> Result<Vec<Hit>> {
        let query_str = sanitize_query(text);
        if query_str.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let parser = QueryParser::for_index(&self.index, vec![self.fields.text]);
        let query = parser.parse_query(&query_str).map_err(|e| {
            EngkitError::Knowledge(format!("cannot parse query '{query_str}': {e}"))
        })?;

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(top_k))
            .map_err(knowledge_err)?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr).map_err(knowledge_err)?;
            hits.push(Hit {
                file: doc
                    .get_first(self.fields.file)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                passage: doc
                    .get_first(self.fields.passage)
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0),
                score,
                text: doc
                    .get_first(self.fields.text)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            });
        }
        Ok(hits)
    }
}

/// Reduce free text to lowercase words so it always parses: query syntax
/// characters become spaces and `AND`/`OR`/`NOT` lose their operator meaning.
pub fn sanitize_query(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The query used for per-system lookups.
pub fn system_query(system: &str, aspect: Option<&str>) -> String {
    format!("{system} {}", aspect.unwrap_or(DEFAULT_ASPECT))
}
