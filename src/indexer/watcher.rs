use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::IndexSettings;
use crate::error::Result;
use crate::gitignore_filter::GitignoreFilter;
use crate::indexer::types::WorkspaceEvent;

/// Recursive file-system watcher feeding workspace events into a channel.
/// Watching stops when this is dropped.
pub struct WorkspaceWatcher {
    _watcher: RecommendedWatcher,
}

impl WorkspaceWatcher {
    pub fn start(
        root: &Path,
        settings: &IndexSettings,
        gitignore: GitignoreFilter,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WorkspaceEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let filter = EventFilter::new(root, settings.clone(), gitignore);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for workspace_event in translate_event(&event) {
                        if filter.accept(&workspace_event) {
                            // Receiver gone means the manager shut down
                            let _ = tx.send(workspace_event);
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            },
            Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        debug!("Watching {:?}", root);

        Ok((Self { _watcher: watcher }, rx))
    }
}

/// Map a native notification to workspace events. Renames become a delete
/// of the old path and a create of the new one.
pub fn translate_event(event: &Event) -> Vec<WorkspaceEvent> {
    let paths = &event.paths;
    match event.kind {
        EventKind::Create(_) => paths.iter().cloned().map(WorkspaceEvent::Created).collect(),
        EventKind::Remove(_) => paths.iter().cloned().map(WorkspaceEvent::Deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.iter().cloned().map(WorkspaceEvent::Deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.iter().cloned().map(WorkspaceEvent::Created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => vec![
            WorkspaceEvent::Deleted(paths[0].clone()),
            WorkspaceEvent::Created(paths[1].clone()),
        ],
        // Platforms that cannot tell which side of a rename a path is on
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .map(|path| {
                if path.exists() {
                    WorkspaceEvent::Created(path.clone())
                } else {
                    WorkspaceEvent::Deleted(path.clone())
                }
            })
            .collect(),
        EventKind::Modify(_) => paths.iter().cloned().map(WorkspaceEvent::Changed).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// Drops events the index has no use for
pub struct EventFilter {
    root: PathBuf,
    settings: IndexSettings,
    gitignore: GitignoreFilter,
}

impl EventFilter {
    pub fn new(root: &Path, settings: IndexSettings, gitignore: GitignoreFilter) -> Self {
        Self {
            root: root.to_path_buf(),
            settings,
            gitignore,
        }
    }

    pub fn accept(&self, event: &WorkspaceEvent) -> bool {
        let path = event.path();

        if self.gitignore.is_gitignore_file(path) {
            self.gitignore.reload();
            return false;
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if self.settings.is_skipped(relative) || self.gitignore.should_ignore(path) {
            return false;
        }

        match event {
            WorkspaceEvent::Changed(_) => self.settings.is_watched_extension(path),
            // Any path may be a directory (`user.detail/`), and a deleted one
            // can no longer be told apart from a file
            WorkspaceEvent::Created(_) | WorkspaceEvent::Deleted(_) => true,
        }
    }
}
