use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IndexError, Result};

/// Directory holding per-workspace settings, relative to the workspace root
pub const SETTINGS_DIR: &str = ".dva-index";
const SETTINGS_FILE: &str = "settings.json";

/// Per-workspace settings stored in .dva-index/settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Directory names whose files are model definitions
    pub model_dirs: Vec<String>,
    /// File stems that are model definitions wherever they live (`model.js`)
    pub model_file_stems: Vec<String>,
    /// Directory names whose files are locale tables
    pub locale_dirs: Vec<String>,
    /// Extension-less path suffixes of route configuration files
    pub router_entries: Vec<String>,
    /// Separator used when flattening nested locale keys
    pub locale_separator: String,
    /// Extensions of the watched language set
    pub extensions: Vec<String>,
    /// Directory names never scanned or watched
    pub skip_dirs: Vec<String>,
    pub debounce_ms: u64,
    pub respect_gitignore: bool,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            model_dirs: strings(&["models"]),
            model_file_stems: strings(&["model"]),
            locale_dirs: strings(&["locales", "locale"]),
            router_entries: strings(&[
                "router",
                "routes",
                "config/config",
                "config/routes",
                ".umirc",
            ]),
            locale_separator: ".".to_string(),
            extensions: strings(&["js", "jsx", "ts", "tsx", "mjs", "cjs"]),
            skip_dirs: strings(&[
                "node_modules",
                "vendor",
                "dist",
                "build",
                ".git",
                ".umi",
                ".umi-production",
                ".next",
                ".output",
                "coverage",
                SETTINGS_DIR,
            ]),
            debounce_ms: 300,
            respect_gitignore: true,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl IndexSettings {
    pub fn settings_path(root: &Path) -> PathBuf {
        root.join(SETTINGS_DIR).join(SETTINGS_FILE)
    }

    /// Load settings for a workspace. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::settings_path(root);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(IndexError::io(path, e)),
        };

        serde_json::from_slice::<IndexSettings>(&bytes).map_err(|e| IndexError::Settings {
            path,
            message: e.to_string(),
        })
    }

    pub fn load_or_default(root: &Path) -> Self {
        Self::load(root).unwrap_or_else(|e| {
            warn!("{}; falling back to default settings", e);
            Self::default()
        })
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::settings_path(root);
        let json = serde_json::to_vec_pretty(self).map_err(|e| IndexError::Settings {
            path: path.clone(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
        }
        fs::write(&path, json).map_err(|e| IndexError::io(path, e))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Whether the path belongs to the watched language set
    pub fn is_watched_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Whether any component of the path is a skipped directory
    pub fn is_skipped(&self, path: &Path) -> bool {
        path.components().any(|component| {
            let name = component.as_os_str().to_string_lossy();
            self.skip_dirs.iter().any(|skip| skip.as_str() == name.as_ref())
        })
    }
}
