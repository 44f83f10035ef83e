use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::extractor::Extraction;
use crate::tree_sitter::{Symbol, Usage};

/// What a file contributes to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A dva model definition
    Model,
    /// A route configuration
    Router,
    /// A locale table
    Locale,
    /// Any other JS-family file; contributes usages only
    Source,
    /// Outside the watched language set
    Irrelevant,
}

impl FileKind {
    pub fn is_indexed(&self) -> bool {
        !matches!(self, FileKind::Irrelevant)
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileKind::Model => "model",
            FileKind::Router => "router",
            FileKind::Locale => "locale",
            FileKind::Source => "source",
            FileKind::Irrelevant => "irrelevant",
        };
        write!(f, "{}", s)
    }
}

/// Everything the index knows about one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub kind: FileKind,
    pub content_hash: String,
    /// 1 on first load, incremented on every replacing reload
    pub revision: u64,
    pub loaded_at: DateTime<Utc>,
    pub symbols: Vec<Symbol>,
    pub usages: Vec<Usage>,
}

impl FileRecord {
    pub fn new(path: PathBuf, kind: FileKind, content_hash: String, extraction: Extraction) -> Self {
        Self {
            path,
            kind,
            content_hash,
            revision: 1,
            loaded_at: Utc::now(),
            symbols: extraction.symbols,
            usages: extraction.usages,
        }
    }
}

/// Lifecycle of a path in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileState {
    Unloaded,
    Loaded { revision: u64 },
    Removed,
}

/// File-system notification delivered to the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkspaceEvent {
    Created(PathBuf),
    Changed(PathBuf),
    Deleted(PathBuf),
}

impl WorkspaceEvent {
    pub fn path(&self) -> &Path {
        match self {
            WorkspaceEvent::Created(path)
            | WorkspaceEvent::Changed(path)
            | WorkspaceEvent::Deleted(path) => path,
        }
    }
}

/// Compute a simple hash of content for change detection
pub fn compute_hash(content: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}
