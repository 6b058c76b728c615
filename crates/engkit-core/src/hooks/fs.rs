use chrono::{DateTime, Utc};
use std::path::Path;
use walkdir::WalkDir;

/// The slice of the filesystem the policy hooks are allowed to observe.
pub trait ProjectFs {
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    fn modified(&self, path: &Path) -> std::io::Result<DateTime<Utc>>;

    /// True if any file below `dir` (recursively) has one of `exts`.
    /// A missing directory is `Ok(false)`.
    fn any_file_with_extension(&self, dir: &Path, exts: &[&str]) -> std::io::Result<bool>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFs;

impl ProjectFs for DiskFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn modified(&self, path: &Path) -> std::io::Result<DateTime<Utc>> {
        let meta = std::fs::metadata(path)?;
        Ok(DateTime::<Utc>::from(meta.modified()?))
    }

    fn any_file_with_extension(&self, dir: &Path, exts: &[&str]) -> std::io::Result<bool> {
        if !dir.is_dir() {
            return Ok(false);
        }
        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let hit = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| exts.iter().any(|want| e.eq_ignore_ascii_case(want)))
                .unwrap_or(false);
            if hit {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
pub(crate) mod mem {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// In-memory filesystem for predicate tests.
    #[derive(Debug, Default)]
    pub struct MemFs {
        files: HashMap<PathBuf, (String, DateTime<Utc>)>,
        unreadable: Vec<PathBuf>,
    }

    impl MemFs {
        pub fn with_file(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
            self.files
                .insert(path.into(), (content.to_string(), Utc::now()));
            self
        }

        pub fn with_file_at(
            mut self,
            path: impl Into<PathBuf>,
            content: &str,
            modified: DateTime<Utc>,
        ) -> Self {
            self.files.insert(path.into(), (content.to_string(), modified));
            self
        }

        pub fn unreadable(mut self, path: impl Into<PathBuf>) -> Self {
            let path = path.into();
            self.files.insert(path.clone(), (String::new(), Utc::now()));
            self.unreadable.push(path);
            self
        }
    }

    impl ProjectFs for MemFs {
        fn exists(&self, path: &Path) -> bool {
            self.files.contains_key(path) || self.files.keys().any(|p| p.starts_with(path))
        }

        fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
            if self.unreadable.iter().any(|p| p == path) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "unreadable",
                ));
            }
            self.files
                .get(path)
                .map(|(c, _)| c.clone())
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }

        fn modified(&self, path: &Path) -> std::io::Result<DateTime<Utc>> {
            self.files
                .get(path)
                .map(|(_, m)| *m)
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }

        fn any_file_with_extension(&self, dir: &Path, exts: &[&str]) -> std::io::Result<bool> {
            Ok(self.files.keys().any(|p| {
                p.starts_with(dir)
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| exts.iter().any(|want| e.eq_ignore_ascii_case(want)))
                        .unwrap_or(false)
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn disk_fs_finds_nested_reference_docs() {
        let dir = TempDir::new().unwrap();
        let refs = dir.path().join("docs/reference/papers");
        std::fs::create_dir_all(&refs).unwrap();
        assert!(!DiskFs
            .any_file_with_extension(&dir.path().join("docs/reference"), &["pdf", "md"])
            .unwrap());

        std::fs::write(refs.join("paper.pdf"), b"%PDF").unwrap();
        assert!(DiskFs
            .any_file_with_extension(&dir.path().join("docs/reference"), &["pdf", "md"])
            .unwrap());
    }

    #[test]
    fn disk_fs_missing_dir_has_no_files() {
        let dir = TempDir::new().unwrap();
        assert!(!DiskFs
            .any_file_with_extension(&dir.path().join("nope"), &["md"])
            .unwrap());
    }

    #[test]
    fn disk_fs_reports_modification_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CONTEXT.md");
        std::fs::write(&path, "x").unwrap();
        let modified = DiskFs.modified(&path).unwrap();
        assert!((Utc::now() - modified).num_minutes() < 5);
    }
}
