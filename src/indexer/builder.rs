use ignore::WalkBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::IndexSettings;
use crate::error::{IndexError, Result};
use crate::indexer::cache::{ModelInfoCache, ReloadOutcome};

/// Result of a full workspace scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Files in the watched language set
    pub files: usize,
    /// Files that produced a record
    pub loaded: usize,
    pub elapsed_ms: u64,
}

/// Every watched file under `root`, sorted. Skipped directories and, when
/// enabled, gitignored paths are left out.
pub fn collect_workspace_files(root: &Path, settings: &IndexSettings) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(IndexError::WorkspaceNotFound(root.to_path_buf()));
    }

    let skip_dirs = settings.skip_dirs.clone();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(settings.respect_gitignore)
        .git_global(settings.respect_gitignore)
        .git_exclude(settings.respect_gitignore)
        .require_git(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !skip_dirs.iter().any(|skip| skip.as_str() == name.as_ref())
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry during scan: {}", e);
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_some_and(|ft| ft.is_file()) && settings.is_watched_extension(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Load every watched file of the workspace into the cache
pub async fn index_workspace(
    cache: &ModelInfoCache,
    root: &Path,
    settings: &IndexSettings,
) -> Result<ScanSummary> {
    let started = Instant::now();
    let files = collect_workspace_files(root, settings)?;

    let mut loaded = 0;
    for path in &files {
        if let ReloadOutcome::Loaded { .. } = cache.reload_file(path).await {
            loaded += 1;
        }
    }

    let summary = ScanSummary {
        files: files.len(),
        loaded,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "Indexed {} of {} files in {:?} ({}ms)",
        summary.loaded, summary.files, root, summary.elapsed_ms
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_index_empty_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let files = collect_workspace_files(temp_dir.path(), &IndexSettings::default()).unwrap();

        assert!(files.is_empty());
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        assert!(matches!(
            collect_workspace_files(&missing, &IndexSettings::default()),
            Err(IndexError::WorkspaceNotFound(_))
        ));
    }

    #[test]
    fn test_skips_ignored_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/models/user.js", "export default {}");
        write(root, "src/pages/index.tsx", "export default () => null;");
        write(root, "src/global.less", "body {}");
        write(root, "node_modules/dva/index.js", "module.exports = {};");
        write(root, "mock/user.js", "export default {}");
        write(root, ".gitignore", "mock/\n");

        let files = collect_workspace_files(root, &IndexSettings::default()).unwrap();

        assert_eq!(
            files,
            vec![root.join("src/models/user.js"), root.join("src/pages/index.tsx")]
        );
    }

    #[test]
    fn test_gitignore_can_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "mock/user.js", "export default {}");
        write(root, ".gitignore", "mock/\n");

        let settings = IndexSettings {
            respect_gitignore: false,
            ..Default::default()
        };
        let files = collect_workspace_files(root, &settings).unwrap();

        assert_eq!(files, vec![root.join("mock/user.js")]);
    }

    #[tokio::test]
    async fn test_index_workspace_loads_cache() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "src/models/user.js",
            "export default { namespace: 'user', effects: { *fetchUser(){} } }",
        );
        write(root, "src/locales/en-US.js", "export default { 'menu.home': 'Home' };");
        write(root, "config/routes.ts", "export default [{ path: '/users' }];");

        let settings = IndexSettings::default();
        let cache = ModelInfoCache::for_workspace(root, &settings).unwrap();
        let summary = index_workspace(&cache, root, &settings).await.unwrap();

        assert_eq!((summary.files, summary.loaded), (3, 3));
        assert_eq!(cache.all_namespaces(), vec!["user"]);
        assert_eq!(cache.query_all_locale_keys(), vec!["menu.home"]);
        assert_eq!(cache.query_all_routes()[0].pattern, "/users");
    }
}
