//! In-memory symbol storage
//!
//! Per-file records plus postings derived from them. Records are the source
//! of truth; postings map each key to the set of files that contribute or
//! reference it and are updated with a per-file diff on every change.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::indexer::types::{FileRecord, FileState};
use crate::tree_sitter::{action_type, Symbol, Usage};

type Posting = BTreeMap<String, BTreeSet<PathBuf>>;

/// Key -> contributing files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Postings {
    pub namespaces: Posting,
    pub routes: Posting,
    pub locale_keys: Posting,
    /// `namespace/action` -> files dispatching it
    pub action_refs: Posting,
    pub message_refs: Posting,
}

impl Postings {
    /// Postings recomputed from scratch
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> Self {
        let mut postings = Self::default();
        for record in records {
            postings.insert(record);
        }
        postings
    }

    fn insert(&mut self, record: &FileRecord) {
        for (posting, key) in keys_of(record) {
            posting_mut(self, posting)
                .entry(key)
                .or_default()
                .insert(record.path.clone());
        }
    }

    fn remove(&mut self, record: &FileRecord) {
        for (posting, key) in keys_of(record) {
            let map = posting_mut(self, posting);
            if let Some(paths) = map.get_mut(&key) {
                paths.remove(&record.path);
                if paths.is_empty() {
                    map.remove(&key);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
            && self.routes.is_empty()
            && self.locale_keys.is_empty()
            && self.action_refs.is_empty()
            && self.message_refs.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum PostingKind {
    Namespace,
    Route,
    LocaleKey,
    ActionRef,
    MessageRef,
}

fn keys_of(record: &FileRecord) -> Vec<(PostingKind, String)> {
    let definitions = record.symbols.iter().filter_map(|symbol| match symbol {
        Symbol::ModelNamespace { name, .. } => Some((PostingKind::Namespace, name.clone())),
        Symbol::RoutePath { pattern, .. } => Some((PostingKind::Route, pattern.clone())),
        Symbol::LocaleKey { key, .. } => Some((PostingKind::LocaleKey, key.clone())),
        Symbol::EffectName { .. } | Symbol::ReducerName { .. } => None,
    });
    let references = record.usages.iter().map(|usage| match usage {
        Usage::Action {
            namespace, action, ..
        } => (PostingKind::ActionRef, action_type(namespace, action)),
        Usage::Message { key, .. } => (PostingKind::MessageRef, key.clone()),
    });
    definitions.chain(references).collect()
}

fn posting_mut(postings: &mut Postings, kind: PostingKind) -> &mut Posting {
    match kind {
        PostingKind::Namespace => &mut postings.namespaces,
        PostingKind::Route => &mut postings.routes,
        PostingKind::LocaleKey => &mut postings.locale_keys,
        PostingKind::ActionRef => &mut postings.action_refs,
        PostingKind::MessageRef => &mut postings.message_refs,
    }
}

/// Records keyed by path, with their postings
#[derive(Debug, Default)]
pub struct SymbolStore {
    files: BTreeMap<PathBuf, FileRecord>,
    postings: Postings,
    /// Paths that were loaded once and then removed
    removed: BTreeSet<PathBuf>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    pub fn postings(&self) -> &Postings {
        &self.postings
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Replace a path's contribution. Returns the new revision.
    pub fn replace_file(&mut self, mut record: FileRecord) -> u64 {
        if let Some(previous) = self.files.remove(&record.path) {
            self.postings.remove(&previous);
            record.revision = previous.revision + 1;
        }
        self.removed.remove(&record.path);
        self.postings.insert(&record);

        let revision = record.revision;
        self.files.insert(record.path.clone(), record);
        revision
    }

    /// Drop a path's contribution. Returns false when nothing was recorded.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        match self.files.remove(path) {
            Some(previous) => {
                self.postings.remove(&previous);
                self.removed.insert(previous.path);
                true
            }
            None => false,
        }
    }

    /// Drop every record at or below `dir` (a deleted directory)
    pub fn remove_prefix(&mut self, dir: &Path) -> Vec<PathBuf> {
        let paths: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|path| path.starts_with(dir))
            .cloned()
            .collect();
        for path in &paths {
            self.remove_file(path);
        }
        paths
    }

    pub fn file_state(&self, path: &Path) -> FileState {
        match self.files.get(path) {
            Some(record) => FileState::Loaded {
                revision: record.revision,
            },
            None if self.removed.contains(path) => FileState::Removed,
            None => FileState::Unloaded,
        }
    }

    /// Postings equal the postings recomputed from the records
    pub fn is_consistent(&self) -> bool {
        self.postings == Postings::from_records(self.files.values())
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.postings = Postings::default();
        self.removed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extraction;
    use crate::indexer::types::FileKind;
    use crate::tree_sitter::Range;

    fn model_record(path: &str, namespace: &str, actions: &[&str]) -> FileRecord {
        let extraction = Extraction {
            symbols: vec![Symbol::ModelNamespace {
                name: namespace.to_string(),
                actions: actions.iter().map(|a| a.to_string()).collect(),
                state: BTreeSet::new(),
                range: Range::default(),
            }],
            usages: vec![],
        };
        FileRecord::new(PathBuf::from(path), FileKind::Model, path.to_string(), extraction)
    }

    fn source_record(path: &str, action: &str) -> FileRecord {
        let (namespace, action) = action.split_once('/').unwrap();
        let extraction = Extraction {
            symbols: vec![],
            usages: vec![Usage::Action {
                namespace: namespace.to_string(),
                action: action.to_string(),
                range: Range::default(),
            }],
        };
        FileRecord::new(PathBuf::from(path), FileKind::Source, path.to_string(), extraction)
    }

    #[test]
    fn test_replace_and_remove() {
        let mut store = SymbolStore::new();
        assert_eq!(store.file_state(Path::new("/w/models/user.js")), FileState::Unloaded);

        assert_eq!(store.replace_file(model_record("/w/models/user.js", "user", &["fetch"])), 1);
        assert_eq!(store.replace_file(model_record("/w/models/user.js", "account", &[])), 2);

        assert!(store.postings().namespaces.contains_key("account"));
        assert!(!store.postings().namespaces.contains_key("user"));
        assert_eq!(
            store.file_state(Path::new("/w/models/user.js")),
            FileState::Loaded { revision: 2 }
        );
        assert!(store.is_consistent());

        assert!(store.remove_file(Path::new("/w/models/user.js")));
        assert!(!store.remove_file(Path::new("/w/models/user.js")));
        assert!(store.postings().is_empty());
        assert_eq!(store.file_state(Path::new("/w/models/user.js")), FileState::Removed);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_shared_keys_survive_partial_removal() {
        let mut store = SymbolStore::new();
        store.replace_file(model_record("/w/models/a.js", "user", &["fetch"]));
        store.replace_file(model_record("/w/models/b.js", "user", &["save"]));
        store.replace_file(source_record("/w/pages/a.js", "user/fetch"));

        store.remove_file(Path::new("/w/models/a.js"));

        let files = &store.postings().namespaces["user"];
        assert_eq!(files.len(), 1);
        assert!(files.contains(Path::new("/w/models/b.js")));
        assert!(store.postings().action_refs.contains_key("user/fetch"));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_remove_prefix() {
        let mut store = SymbolStore::new();
        store.replace_file(model_record("/w/src/models/a.js", "a", &[]));
        store.replace_file(model_record("/w/src/models/admin/b.js", "b", &[]));
        store.replace_file(model_record("/w/src/modelsx/c.js", "c", &[]));

        let removed = store.remove_prefix(Path::new("/w/src/models"));

        assert_eq!(removed.len(), 2);
        assert_eq!(store.file_count(), 1);
        assert!(store.postings().namespaces.contains_key("c"));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_clear_forgets_tombstones() {
        let mut store = SymbolStore::new();
        store.replace_file(model_record("/w/models/a.js", "a", &[]));
        store.remove_file(Path::new("/w/models/a.js"));
        store.clear();

        assert_eq!(store.file_state(Path::new("/w/models/a.js")), FileState::Unloaded);
        assert!(store.postings().is_empty());
    }
}
