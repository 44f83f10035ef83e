use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// The workspace's root `.gitignore`, shared between the watcher callback and
/// whoever reloads it. Clones share the same rules.
#[derive(Clone)]
pub struct GitignoreFilter {
    root: PathBuf,
    enabled: bool,
    rules: Arc<RwLock<Option<Gitignore>>>,
}

impl GitignoreFilter {
    pub fn new(root: &Path) -> Self {
        let filter = Self {
            root: root.to_path_buf(),
            enabled: true,
            rules: Arc::new(RwLock::new(None)),
        };
        filter.reload();
        filter
    }

    /// Never ignores anything, whatever `.gitignore` says now or later
    pub fn disabled(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            enabled: false,
            rules: Arc::new(RwLock::new(None)),
        }
    }

    /// Re-read `.gitignore`; a disabled filter stays empty
    pub fn reload(&self) {
        if !self.enabled {
            return;
        }
        let rules = build_rules(&self.root);
        *self.rules.write().unwrap_or_else(|e| e.into_inner()) = rules;
    }

    pub fn is_gitignore_file(&self, path: &Path) -> bool {
        path == self.root.join(".gitignore")
    }

    /// Whether `path` (absolute, or relative to the root) or any of its parent
    /// directories is ignored. Paths outside the workspace never are.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
        let Some(gitignore) = rules.as_ref() else {
            return false;
        };

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let relative = match absolute.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            _ => return false,
        };

        matches!(
            gitignore.matched_path_or_any_parents(relative, absolute.is_dir()),
            Match::Ignore(_)
        )
    }
}

/// Broken or missing rules ignore nothing
fn build_rules(root: &Path) -> Option<Gitignore> {
    let path = root.join(".gitignore");
    if !path.is_file() {
        debug!("No .gitignore at {:?}", path);
        return None;
    }

    let mut builder = GitignoreBuilder::new(root);
    if let Some(e) = builder.add(&path) {
        warn!("Failed to read {:?}: {}", path, e);
        return None;
    }
    builder
        .build()
        .map_err(|e| warn!("Invalid rules in {:?}: {}", path, e))
        .ok()
}
