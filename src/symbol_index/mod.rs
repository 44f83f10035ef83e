//! Symbol index for dva workspaces
//!
//! Per-file records and the postings derived from them, plus the query API
//! the cache and language service read through.

mod search;
mod store;

pub use search::{
    ActionDefinition, DefinitionKind, IndexSnapshot, IndexStats, NamespaceInfo, RouteEntry,
    SearchQuery, SearchResult,
};
pub use store::{Postings, SymbolStore};
