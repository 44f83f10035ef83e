use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::IndexSettings;
use crate::error::{IndexError, Result};
use crate::gitignore_filter::GitignoreFilter;
use crate::indexer::builder::{collect_workspace_files, index_workspace, ScanSummary};
use crate::indexer::cache::ModelInfoCache;
use crate::indexer::types::WorkspaceEvent;
use crate::indexer::watcher::WorkspaceWatcher;
use crate::language_service::LanguageService;

/// Owns the cache for one workspace, from activation to shutdown
pub struct IndexerManager {
    root: PathBuf,
    settings: IndexSettings,
    cache: ModelInfoCache,
    scan: ScanSummary,
    watcher: Option<WorkspaceWatcher>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    event_loop: Option<JoinHandle<()>>,
}

impl IndexerManager {
    /// Activate with the workspace's own settings file
    pub async fn start(root: &Path) -> Result<Self> {
        let settings = IndexSettings::load_or_default(root);
        Self::start_with_settings(root, settings).await
    }

    pub async fn start_with_settings(root: &Path, settings: IndexSettings) -> Result<Self> {
        let root = root.canonicalize().map_err(|e| match e.kind() {
            ErrorKind::NotFound => IndexError::WorkspaceNotFound(root.to_path_buf()),
            _ => IndexError::io(root, e),
        })?;
        info!("Starting index for {:?}", root);

        let cache = ModelInfoCache::for_workspace(&root, &settings)?;
        let gitignore = if settings.respect_gitignore {
            GitignoreFilter::new(&root)
        } else {
            GitignoreFilter::disabled(&root)
        };

        // Watch before scanning so edits made during the scan are replayed
        let (watcher, rx) = match WorkspaceWatcher::start(&root, &settings, gitignore) {
            Ok((watcher, rx)) => (Some(watcher), rx),
            Err(e) => {
                warn!("Failed to start file watcher, index will not follow edits: {}", e);
                let (_tx, rx) = mpsc::unbounded_channel();
                (None, rx)
            }
        };

        let scan = index_workspace(&cache, &root, &settings).await?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let event_loop = tokio::spawn(run_event_loop(
            cache.clone(),
            rx,
            settings.clone(),
            shutdown_rx,
        ));

        Ok(Self {
            root,
            settings,
            cache,
            scan,
            watcher,
            shutdown_tx: Some(shutdown_tx),
            event_loop: Some(event_loop),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    pub fn cache(&self) -> &ModelInfoCache {
        &self.cache
    }

    pub fn scan_summary(&self) -> ScanSummary {
        self.scan
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn language_service(&self) -> LanguageService {
        LanguageService::new(self.cache.clone())
    }

    /// Stop watching, finish the event loop and drop all records
    pub async fn shutdown(mut self) {
        self.watcher.take();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.event_loop.take() {
            if let Err(e) = handle.await {
                warn!("Event loop ended abnormally: {}", e);
            }
        }
        self.cache.clear();
        info!("Index for {:?} shut down", self.root);
    }
}

impl Drop for IndexerManager {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
    }
}

async fn run_event_loop(
    cache: ModelInfoCache,
    mut rx: mpsc::UnboundedReceiver<WorkspaceEvent>,
    settings: IndexSettings,
    mut shutdown: oneshot::Receiver<()>,
) {
    let debounce = settings.debounce();

    loop {
        let first = tokio::select! {
            _ = &mut shutdown => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        // Gather the burst that follows the first event
        let mut batch = vec![first];
        let deadline = Instant::now() + debounce;
        while let Ok(Some(event)) = timeout_at(deadline, rx.recv()).await {
            batch.push(event);
        }

        for event in coalesce(batch) {
            apply_event(&cache, &settings, &event).await;
        }
    }

    debug!("Event loop stopped");
}

async fn apply_event(cache: &ModelInfoCache, settings: &IndexSettings, event: &WorkspaceEvent) {
    match event {
        // A directory moved into the workspace
        WorkspaceEvent::Created(path) if path.is_dir() => {
            match collect_workspace_files(path, settings) {
                Ok(files) => {
                    for file in files {
                        cache.reload_file(&file).await;
                    }
                }
                Err(e) => warn!("Failed to scan {:?}: {}", path, e),
            }
        }
        _ => {
            let outcome = cache.handle_event(event).await;
            debug!("{:?} -> {:?}", event, outcome);
        }
    }
}

/// Keep the last event per path, in the order those last events arrived
fn coalesce(events: Vec<WorkspaceEvent>) -> Vec<WorkspaceEvent> {
    let mut last: HashMap<PathBuf, (usize, WorkspaceEvent)> = HashMap::new();
    for (i, event) in events.into_iter().enumerate() {
        last.insert(event.path().to_path_buf(), (i, event));
    }

    let mut ordered: Vec<(usize, WorkspaceEvent)> = last.into_values().collect();
    ordered.sort_by_key(|(i, _)| *i);
    ordered.into_iter().map(|(_, event)| event).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings() -> IndexSettings {
        IndexSettings {
            debounce_ms: 50,
            ..Default::default()
        }
    }

    async fn eventually(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[test]
    fn test_coalesce_keeps_last_event_per_path() {
        let a = PathBuf::from("/w/a.js");
        let b = PathBuf::from("/w/b.js");
        let events = vec![
            WorkspaceEvent::Created(a.clone()),
            WorkspaceEvent::Changed(b.clone()),
            WorkspaceEvent::Changed(a.clone()),
            WorkspaceEvent::Deleted(b.clone()),
        ];

        assert_eq!(
            coalesce(events),
            vec![WorkspaceEvent::Changed(a), WorkspaceEvent::Deleted(b)]
        );
    }

    #[tokio::test]
    async fn test_directory_events_cover_their_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let settings = IndexSettings::default();
        let cache = ModelInfoCache::for_workspace(root, &settings).unwrap();

        let detail = root.join("src/pages/user.detail");
        let versioned = root.join("src/models.v2");
        fs::create_dir_all(detail.join("components")).unwrap();
        fs::create_dir_all(&versioned).unwrap();
        fs::write(
            detail.join("model.js"),
            "export default { namespace: 'detail', effects: { *load(){} } }",
        )
        .unwrap();
        fs::write(
            detail.join("components/Card.jsx"),
            "dispatch({ type: 'detail/load' });",
        )
        .unwrap();
        fs::write(
            versioned.join("model.ts"),
            "export default { namespace: 'v2', reducers: { save(s){ return s; } } }",
        )
        .unwrap();

        apply_event(&cache, &settings, &WorkspaceEvent::Created(detail.clone())).await;
        apply_event(&cache, &settings, &WorkspaceEvent::Created(versioned.clone())).await;

        assert_eq!(cache.all_namespaces(), vec!["detail", "v2"]);
        assert_eq!(cache.find_references("detail", "load").len(), 1);
        assert!(cache.is_consistent());

        fs::remove_dir_all(&detail).unwrap();
        apply_event(&cache, &settings, &WorkspaceEvent::Deleted(detail)).await;

        assert_eq!(cache.all_namespaces(), vec!["v2"]);
        assert!(cache.find_references("detail", "load").is_empty());
        assert!(cache.is_consistent());
    }

    #[tokio::test]
    async fn test_missing_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let result = IndexerManager::start_with_settings(&temp_dir.path().join("nope"), settings()).await;

        assert!(matches!(result, Err(IndexError::WorkspaceNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watcher_follows_edits() {
        let temp_dir = TempDir::new().unwrap();
        let models = temp_dir.path().join("src/models");
        fs::create_dir_all(&models).unwrap();
        fs::write(
            models.join("user.js"),
            "export default { namespace: 'user', effects: { *fetchUser(){} } }",
        )
        .unwrap();

        let manager = IndexerManager::start_with_settings(temp_dir.path(), settings())
            .await
            .unwrap();
        let cache = manager.cache().clone();
        assert_eq!(manager.scan_summary().loaded, 1);
        assert_eq!(cache.all_namespaces(), vec!["user"]);

        if !manager.is_watching() {
            return;
        }

        fs::write(
            models.join("todo.js"),
            "export default { namespace: 'todo', reducers: { add(s) { return s; } } }",
        )
        .unwrap();
        assert!(eventually(|| cache.query_namespace("todo").is_some()).await);

        fs::remove_file(models.join("user.js")).unwrap();
        assert!(eventually(|| cache.query_namespace("user").is_none()).await);
        assert!(cache.is_consistent());

        manager.shutdown().await;
        assert!(cache.all_namespaces().is_empty());
    }
}
