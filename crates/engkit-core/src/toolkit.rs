//! The toolkit: the template tree copied into every new project.
//!
//! The tree is embedded in the binary at build time. An on-disk tree with
//! the same layout can be substituted (`--toolkit <dir>`), which is how
//! toolkit authors iterate on templates without rebuilding.
//!
//! # Layout
//! - `project-scaffold/` → copied to the project root
//! - `claude/`           → copied to `.claude/`
//! - `templates/`        → copied to `templates/`
//! - `scripts/`          → copied to `scripts/`
//! - `requirements-engineering.txt`
//!
//! # Naming conventions
//! - `*.template` files have `{{PLACEHOLDER}}` tokens replaced and lose the suffix.
//! - A `dot_` prefix on any path segment becomes `.` (`dot_gitignore` → `.gitignore`).

use crate::config::ProjectKind;
use crate::error::{EngkitError, Result};
use chrono::{Datelike, NaiveDate};
use rust_embed::Embed;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Version of the embedded toolkit, which is the binary version.
pub const TOOLKIT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const SCAFFOLD_SECTION: &str = "project-scaffold";
pub const CLAUDE_SECTION: &str = "claude";
pub const TEMPLATES_SECTION: &str = "templates";
pub const SCRIPTS_SECTION: &str = "scripts";
pub const REQUIREMENTS_ASSET: &str = "requirements-engineering.txt";

const TEMPLATE_SUFFIX: &str = ".template";
const DOT_PREFIX: &str = "dot_";

#[derive(Embed)]
#[folder = "toolkit/"]
struct ToolkitAssets;

// ---------------------------------------------------------------------------
// Asset / Toolkit
// ---------------------------------------------------------------------------

/// One file of the toolkit. `path` is relative to the section it was listed
/// from and always uses `/` separators.
#[derive(Debug, Clone)]
pub struct Asset {
    pub path: String,
    pub data: Vec<u8>,
}

impl Asset {
    pub fn is_template(&self) -> bool {
        self.path.ends_with(TEMPLATE_SUFFIX)
    }

    /// Destination path relative to the install directory.
    pub fn output_path(&self) -> PathBuf {
        output_path(&self.path)
    }

    /// File contents with placeholders applied when this is a template.
    pub fn render(&self, replacements: &Replacements) -> Result<Vec<u8>> {
        if !self.is_template() {
            return Ok(self.data.clone());
        }
        let text = std::str::from_utf8(&self.data)
            .map_err(|_| EngkitError::InvalidAsset(self.path.clone()))?;
        Ok(replacements.apply(text).into_bytes())
    }
}

pub trait Toolkit {
    /// Version string stamped into projects created from this toolkit.
    fn version(&self) -> String;

    /// All files under `section`, sorted by path.
    fn section(&self, section: &str) -> Result<Vec<Asset>>;

    /// A single top-level file, if present.
    fn file(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Output file names (first path segment) that `section` installs.
    fn top_level_names(&self, section: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .section(section)?
            .iter()
            .map(|a| a.output_path())
            .filter_map(|p| {
                p.components()
                    .next()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// EmbeddedToolkit
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedToolkit;

impl Toolkit for EmbeddedToolkit {
    fn version(&self) -> String {
        TOOLKIT_VERSION.to_string()
    }

    fn section(&self, section: &str) -> Result<Vec<Asset>> {
        let prefix = format!("{section}/");
        let mut assets: Vec<Asset> = <ToolkitAssets as Embed>::iter()
            .filter_map(|name| {
                let rel = name.strip_prefix(&prefix)?.to_string();
                let file = <ToolkitAssets as Embed>::get(&name)?;
                Some(Asset {
                    path: rel,
                    data: file.data.into_owned(),
                })
            })
            .collect();
        assets.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(assets)
    }

    fn file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(<ToolkitAssets as Embed>::get(path).map(|f| f.data.into_owned()))
    }
}

// ---------------------------------------------------------------------------
// DirToolkit
// ---------------------------------------------------------------------------

/// A toolkit read from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirToolkit {
    root: PathBuf,
}

impl DirToolkit {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(EngkitError::ToolkitNotFound(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl Toolkit for DirToolkit {
    fn version(&self) -> String {
        std::fs::read_to_string(self.root.join("VERSION"))
            .map(|v| v.trim().to_string())
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| TOOLKIT_VERSION.to_string())
    }

    fn section(&self, section: &str) -> Result<Vec<Asset>> {
        let base = self.root.join(section);
        if !base.is_dir() {
            return Ok(Vec::new());
        }
        let mut assets = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&base)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            assets.push(Asset {
                path: rel,
                data: std::fs::read(entry.path())?,
            });
        }
        assets.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(assets)
    }

    fn file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let p = self.root.join(path);
        if !p.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(p)?))
    }
}

// ---------------------------------------------------------------------------
// Replacements
// ---------------------------------------------------------------------------

/// `{{KEY}}` → value substitutions applied to `*.template` assets.
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    values: BTreeMap<&'static str, String>,
}

impl Replacements {
    pub fn new(
        name: &str,
        description: &str,
        kind: ProjectKind,
        today: NaiveDate,
        toolkit_version: &str,
    ) -> Self {
        let mut values = BTreeMap::new();
        values.insert("PROJECT_NAME", name.to_string());
        values.insert("PROJECT_DESCRIPTION", description.to_string());
        values.insert("PROJECT_TYPE", kind.as_str().to_string());
        values.insert("DATE", today.format("%Y-%m-%d").to_string());
        values.insert("YEAR", today.year().to_string());
        values.insert("TOOLKIT_VERSION", toolkit_version.to_string());
        Self { values }
    }

    /// Replace every known `{{KEY}}`; unknown tokens are left untouched.
    pub fn apply(&self, content: &str) -> String {
        let mut out = content.to_string();
        for (key, value) in &self.values {
            out = out.replace(&format!("{{{{{key}}}}}"), value);
        }
        out
    }
}

/// Default description when the user gives none.
pub fn default_description(name: &str) -> String {
    format!("{name} engineering project")
}

// ---------------------------------------------------------------------------
// Path mapping
// ---------------------------------------------------------------------------

fn output_path(asset_path: &str) -> PathBuf {
    let trimmed = asset_path
        .strip_suffix(TEMPLATE_SUFFIX)
        .unwrap_or(asset_path);
    trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| match segment.strip_prefix(DOT_PREFIX) {
            Some(rest) => format!(".{rest}"),
            None => segment.to_string(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
