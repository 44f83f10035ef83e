//! Error types for the dva index.
//!
//! Only setup paths fail with these errors. Extraction and queries degrade to
//! empty results instead of raising.

use crate::tree_sitter::TreeSitterError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {path:?}: {message}")]
    Settings { path: PathBuf, message: String },

    #[error("Workspace root does not exist: {0:?}")]
    WorkspaceNotFound(PathBuf),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Parser(#[from] TreeSitterError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, IndexError>;
