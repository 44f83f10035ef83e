//! Incremental model cache
//!
//! `ModelInfoCache` owns the symbol store behind a shared lock. Every update
//! reads first (the only await point), extracts outside the lock, then swaps
//! the path's contribution under a single write lock, so a query sees either
//! the whole update or none of it.

use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::config::IndexSettings;
use crate::error::Result;
use crate::extractor::SymbolExtractor;
use crate::indexer::classifier::FileClassifier;
use crate::indexer::types::{compute_hash, FileKind, FileRecord, FileState, WorkspaceEvent};
use crate::symbol_index::{
    ActionDefinition, IndexSnapshot, IndexStats, NamespaceInfo, RouteEntry, SearchQuery,
    SearchResult, SymbolStore,
};
use crate::tree_sitter::{Location, Position, Symbol, Usage};

/// What a reload did to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Contribution replaced; carries the new revision
    Loaded { revision: u64 },
    /// Same content and classification as the current record
    Unchanged,
    /// Records dropped (more than one when a directory vanished)
    Removed { files: usize },
    /// A newer reload for the same path was issued meanwhile
    Superseded,
    /// Nothing to do: irrelevant file or unreadable path
    Skipped,
}

#[derive(Clone)]
pub struct ModelInfoCache {
    store: Arc<RwLock<SymbolStore>>,
    extractor: Arc<Mutex<SymbolExtractor>>,
    classifier: Arc<FileClassifier>,
    tickets: Arc<Mutex<HashMap<PathBuf, u64>>>,
    next_ticket: Arc<AtomicU64>,
}

impl ModelInfoCache {
    pub fn new(settings: &IndexSettings) -> Result<Self> {
        Self::with_classifier(settings, FileClassifier::new(settings))
    }

    /// Cache whose directory rules are relative to `root`
    pub fn for_workspace(root: &Path, settings: &IndexSettings) -> Result<Self> {
        Self::with_classifier(settings, FileClassifier::new(settings).with_root(root))
    }

    fn with_classifier(settings: &IndexSettings, classifier: FileClassifier) -> Result<Self> {
        Ok(Self {
            store: Arc::new(RwLock::new(SymbolStore::new())),
            extractor: Arc::new(Mutex::new(SymbolExtractor::new(settings)?)),
            classifier: Arc::new(classifier),
            tickets: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: Arc::new(AtomicU64::new(1)),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, SymbolStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SymbolStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Issue the newest ticket for `path`; older tickets can no longer apply.
    pub(crate) fn begin_reload(&self, path: &Path) -> u64 {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        self.tickets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), ticket);
        ticket
    }

    /// Retire `ticket`. True when it was still the newest for `path`; a
    /// missing entry means a newer reload already settled.
    fn settle(&self, path: &Path, ticket: u64) -> bool {
        let mut tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
        match tickets.get(path) {
            Some(latest) if *latest == ticket => {
                tickets.remove(path);
                true
            }
            _ => false,
        }
    }

    // ---- updates ----

    /// Re-read `path` from disk and replace its contribution. A missing path
    /// is a deletion, of a file or of a whole directory.
    pub async fn reload_file(&self, path: &Path) -> ReloadOutcome {
        let ticket = self.begin_reload(path);

        match tokio::fs::read_to_string(path).await {
            Ok(content) => self.apply_content(path, &content, ticket),
            Err(e) if e.kind() == ErrorKind::NotFound => self.apply_removal(path, ticket),
            Err(e) => {
                // Keep whatever the path contributed before; its state is unknown
                warn!("Failed to read {:?}: {}", path, e);
                self.settle(path, ticket);
                ReloadOutcome::Skipped
            }
        }
    }

    /// Replace a path's contribution from in-memory content
    pub fn reload_content(&self, path: &Path, content: &str) -> ReloadOutcome {
        let ticket = self.begin_reload(path);
        self.apply_content(path, content, ticket)
    }

    /// Drop a path's contribution, including everything below it
    pub fn remove_file(&self, path: &Path) -> ReloadOutcome {
        let ticket = self.begin_reload(path);
        self.apply_removal(path, ticket)
    }

    pub async fn handle_event(&self, event: &WorkspaceEvent) -> ReloadOutcome {
        match event {
            WorkspaceEvent::Created(path) | WorkspaceEvent::Changed(path) => {
                self.reload_file(path).await
            }
            WorkspaceEvent::Deleted(path) => self.remove_file(path),
        }
    }

    pub(crate) fn apply_content(&self, path: &Path, content: &str, ticket: u64) -> ReloadOutcome {
        let kind = self.classifier.classify(path, Some(content));
        if !kind.is_indexed() {
            self.settle(path, ticket);
            return ReloadOutcome::Skipped;
        }

        let content_hash = compute_hash(content);
        let unchanged = self
            .read()
            .get(path)
            .is_some_and(|record| record.content_hash == content_hash && record.kind == kind);
        if unchanged {
            self.settle(path, ticket);
            return ReloadOutcome::Unchanged;
        }

        let extraction = self
            .extractor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extract(path, content, kind);

        let mut store = self.write();
        if !self.settle(path, ticket) {
            debug!("Dropping stale reload of {:?}", path);
            return ReloadOutcome::Superseded;
        }
        let record = FileRecord::new(path.to_path_buf(), kind, content_hash, extraction);
        let revision = store.replace_file(record);
        debug!("Indexed {:?} as {} (revision {})", path, kind, revision);

        ReloadOutcome::Loaded { revision }
    }

    fn apply_removal(&self, path: &Path, ticket: u64) -> ReloadOutcome {
        let mut store = self.write();
        if !self.settle(path, ticket) {
            return ReloadOutcome::Superseded;
        }
        let removed = store.remove_prefix(path);
        if !removed.is_empty() {
            debug!("Removed {} record(s) under {:?}", removed.len(), path);
        }
        ReloadOutcome::Removed {
            files: removed.len(),
        }
    }

    /// Drop every record; used on shutdown
    pub fn clear(&self) {
        let mut store = self.write();
        store.clear();
        self.tickets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    // ---- queries ----

    pub fn classify(&self, path: &Path, content: Option<&str>) -> FileKind {
        self.classifier.classify(path, content)
    }

    pub fn query_namespace(&self, name: &str) -> Option<NamespaceInfo> {
        self.read().query_namespace(name)
    }

    pub fn query_actions_for_namespace(&self, name: &str) -> BTreeSet<String> {
        self.query_namespace(name)
            .map(|info| info.actions)
            .unwrap_or_default()
    }

    pub fn query_action_definitions(&self, namespace: &str, action: &str) -> Vec<ActionDefinition> {
        self.read().query_action_definitions(namespace, action)
    }

    pub fn all_namespaces(&self) -> Vec<String> {
        self.read().all_namespaces()
    }

    pub fn all_action_types(&self) -> Vec<String> {
        self.read().all_action_types()
    }

    pub fn query_locale_key(&self, key: &str) -> Vec<Location> {
        self.read().query_locale_key(key)
    }

    pub fn query_all_locale_keys(&self) -> Vec<String> {
        self.read().query_all_locale_keys()
    }

    pub fn query_route_at(&self, path: &Path, position: Position) -> Option<RouteEntry> {
        self.read().query_route_at(path, position)
    }

    pub fn query_all_routes(&self) -> Vec<RouteEntry> {
        self.read().query_all_routes()
    }

    pub fn find_references(&self, namespace: &str, action: &str) -> Vec<Location> {
        self.read().find_references(namespace, action)
    }

    pub fn find_locale_references(&self, key: &str) -> Vec<Location> {
        self.read().find_locale_references(key)
    }

    pub fn usage_at(&self, path: &Path, position: Position) -> Option<Usage> {
        self.read().usage_at(path, position)
    }

    pub fn symbol_at(&self, path: &Path, position: Position) -> Option<Symbol> {
        self.read().symbol_at(path, position)
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        self.read().search(query)
    }

    pub fn file_state(&self, path: &Path) -> FileState {
        self.read().file_state(path)
    }

    pub fn file_record(&self, path: &Path) -> Option<FileRecord> {
        self.read().get(path).cloned()
    }

    pub fn stats(&self) -> IndexStats {
        self.read().stats()
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        self.read().snapshot()
    }

    pub fn is_consistent(&self) -> bool {
        self.read().is_consistent()
    }
}
