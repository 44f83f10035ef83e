//! File classification
//!
//! Decides which extractor applies to a file from its path, falling back to a
//! cheap content sniff when no path rule matches.

use regex::Regex;
use std::path::{Component, Path, PathBuf};

use crate::config::IndexSettings;
use crate::indexer::types::FileKind;

lazy_static::lazy_static! {
    static ref NAMESPACE_KEY: Regex = Regex::new(r#"\bnamespace\s*:\s*['"`]"#).unwrap();
    static ref MODEL_SECTION: Regex =
        Regex::new(r"\b(state|reducers|effects|subscriptions)\s*:").unwrap();
    static ref DEFAULT_EXPORT: Regex =
        Regex::new(r"\bexport\s+default\b|\bmodule\.exports\s*=").unwrap();
}

/// Path and content based classifier
#[derive(Debug, Clone)]
pub struct FileClassifier {
    root: Option<PathBuf>,
    model_dirs: Vec<String>,
    model_file_stems: Vec<String>,
    locale_dirs: Vec<String>,
    router_entries: Vec<String>,
    extensions: Vec<String>,
}

impl FileClassifier {
    pub fn new(settings: &IndexSettings) -> Self {
        Self {
            root: None,
            model_dirs: settings.model_dirs.clone(),
            model_file_stems: settings.model_file_stems.clone(),
            locale_dirs: settings.locale_dirs.clone(),
            router_entries: settings
                .router_entries
                .iter()
                .map(|entry| entry.trim_matches('/').to_string())
                .collect(),
            extensions: settings.extensions.clone(),
        }
    }

    /// Match directory rules relative to `root` so that directories above the
    /// workspace never influence classification.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Classify a file. Deterministic and infallible.
    ///
    /// Rules, most specific first: router entry, closest model or locale
    /// directory, model file stem, content sniff, then `Source`.
    pub fn classify(&self, path: &Path, content: Option<&str>) -> FileKind {
        if !self.is_watched(path) {
            return FileKind::Irrelevant;
        }

        let relative = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);

        if self.is_router_entry(relative) {
            return FileKind::Router;
        }

        if let Some(kind) = self.closest_directory_kind(relative) {
            return kind;
        }

        let stem = relative.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if self.model_file_stems.iter().any(|s| s == stem) {
            return FileKind::Model;
        }

        match content {
            Some(content) if looks_like_model(content) => FileKind::Model,
            _ => FileKind::Source,
        }
    }

    fn is_watched(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    fn is_router_entry(&self, relative: &Path) -> bool {
        let without_ext = normalized(&relative.with_extension(""));
        self.router_entries.iter().any(|entry| {
            without_ext == *entry || without_ext.ends_with(&format!("/{}", entry))
        })
    }

    fn closest_directory_kind(&self, relative: &Path) -> Option<FileKind> {
        let parent = relative.parent()?;
        let dirs: Vec<String> = parent
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();

        dirs.iter().rev().find_map(|dir| {
            if self.model_dirs.iter().any(|d| d == dir) {
                Some(FileKind::Model)
            } else if self.locale_dirs.iter().any(|d| d == dir) {
                Some(FileKind::Locale)
            } else {
                None
            }
        })
    }
}

/// An exported object with a `namespace` string and a model section
fn looks_like_model(content: &str) -> bool {
    DEFAULT_EXPORT.is_match(content)
        && NAMESPACE_KEY.is_match(content)
        && MODEL_SECTION.is_match(content)
}

fn normalized(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
