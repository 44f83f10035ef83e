pub mod builder;
pub mod cache;
pub mod classifier;
pub mod manager;
pub mod types;
pub mod watcher;

pub use builder::{collect_workspace_files, index_workspace, ScanSummary};
pub use cache::{ModelInfoCache, ReloadOutcome};
pub use classifier::FileClassifier;
pub use manager::IndexerManager;
pub use types::{FileKind, FileRecord, FileState, WorkspaceEvent};
pub use watcher::{translate_event, EventFilter, WorkspaceWatcher};
