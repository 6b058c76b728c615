use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngkitError {
    #[error("not an engkit project: no {0} found")]
    NotAProject(PathBuf),

    #[error("invalid project name '{0}': must start with a letter and contain only letters, numbers, hyphens, and underscores")]
    InvalidProjectName(String),

    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("target path already exists: {0}")]
    TargetExists(PathBuf),

    #[error("toolkit directory not found: {0}")]
    ToolkitNotFound(PathBuf),

    #[error("toolkit asset is not valid UTF-8: {0}")]
    InvalidAsset(String),

    #[error("knowledge index not built: run 'engkit knowledge index' first")]
    KnowledgeIndexMissing,

    #[error("knowledge index error: {0}")]
    Knowledge(String),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngkitError>;
