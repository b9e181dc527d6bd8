//! Engine configuration and the on-disk layout derived from it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::network::DEFAULT_VIRTUAL_MARKERS;

pub const CONFIG_FILE_NAME: &str = "hwid.json";
pub const SNAPSHOT_FILE_NAME: &str = "hwid_backup.json";
pub const JOURNAL_FILE_NAME: &str = "hwid_journal.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// User-tunable settings, read from `hwid.json`.
///
/// Relative paths are resolved against the layout root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub snapshot_path: PathBuf,
    pub journal_path: PathBuf,
    pub diagnostics_dir: PathBuf,
    pub adapter_restart_pause_ms: u64,
    pub virtual_adapter_markers: Vec<String>,
    /// Depth bound for device-map walks and hardware-config copies.
    pub subtree_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(SNAPSHOT_FILE_NAME),
            journal_path: PathBuf::from(JOURNAL_FILE_NAME),
            diagnostics_dir: PathBuf::from("."),
            adapter_restart_pause_ms: 2000,
            virtual_adapter_markers: DEFAULT_VIRTUAL_MARKERS.iter().map(|m| m.to_string()).collect(),
            subtree_depth: 8,
        }
    }
}

impl EngineConfig {
    pub fn adapter_restart_pause(&self) -> Duration {
        Duration::from_millis(self.adapter_restart_pause_ms)
    }
}

/// Load `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfig::default()),
        Err(source) => Err(ConfigError::Read { path: path.to_path_buf(), source }),
    }
}

/// Concrete file locations for one engine root (normally the executable's directory).
///
/// Pure path computation; nothing here touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLayout {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub journal_path: PathBuf,
    pub diagnostics_dir: PathBuf,
}

impl EngineLayout {
    /// Layout under `root` with default file names.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_config(root, &EngineConfig::default())
    }

    /// Layout under `root`, with the config's paths resolved against it.
    pub fn with_config(root: impl AsRef<Path>, config: &EngineConfig) -> Self {
        let root = root.as_ref().to_path_buf();
        let resolve = |p: &Path| if p.is_absolute() { p.to_path_buf() } else { root.join(p) };
        Self {
            config_path: root.join(CONFIG_FILE_NAME),
            snapshot_path: resolve(&config.snapshot_path),
            journal_path: resolve(&config.journal_path),
            diagnostics_dir: resolve(&config.diagnostics_dir),
            root,
        }
    }
}
