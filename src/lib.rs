//! Incremental index of dva models, routes and locale keys
//!
//! The [`IndexerManager`] scans a workspace, keeps a [`ModelInfoCache`] in
//! step with file-system edits and hands out a [`LanguageService`] for
//! completion, hover, definition and reference lookups.

pub mod config;
pub mod error;
pub mod extractor;
pub mod gitignore_filter;
pub mod indexer;
pub mod language_service;
pub mod symbol_index;
pub mod tree_sitter;

pub use config::IndexSettings;
pub use error::{IndexError, Result};
pub use indexer::{FileKind, IndexerManager, ModelInfoCache, ReloadOutcome, ScanSummary};
pub use language_service::LanguageService;
pub use symbol_index::{
    ActionDefinition, DefinitionKind, IndexSnapshot, IndexStats, NamespaceInfo, RouteEntry,
    SearchQuery, SearchResult,
};
pub use tree_sitter::{ActionKind, Location, Position, Range, Symbol, Usage};
