//! Snapshot store: the single-slot backup of original identifier values, and the
//! journal of classes spoofed since that backup was taken.
//!
//! The snapshot file is a flat JSON object `"<class-slug>/<field-key>" -> string | null`.
//! A missing file means "no backup yet"; a file that exists but cannot be parsed
//! is an error.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::write_field;
use crate::catalog::Catalog;
use crate::config::EngineLayout;
use crate::error::{EngineResult, Privilege};
use crate::model::{IdentifierClass, StoreValue};
use crate::sources::Sources;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Original values keyed by `<class-slug>/<field-key>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, Option<String>>,
}

impl Snapshot {
    pub fn key(class: IdentifierClass, field_key: &str) -> String {
        format!("{}/{}", class.slug(), field_key)
    }

    /// `None` when the key was not captured, `Some(None)` when it was captured unset.
    pub fn get(&self, class: IdentifierClass, field_key: &str) -> Option<Option<&str>> {
        self.values.get(&Self::key(class, field_key)).map(|v| v.as_deref())
    }

    pub fn insert(&mut self, class: IdentifierClass, field_key: &str, value: Option<String>) {
        self.values.insert(Self::key(class, field_key), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Flatten `get_current` of every class. Classes that fail to enumerate are
    /// left out and returned alongside.
    pub fn capture(catalog: &Catalog, sources: &Sources) -> (Snapshot, Vec<(IdentifierClass, String)>) {
        let mut snapshot = Snapshot::default();
        let mut failures = Vec::new();
        for class in catalog.list_classes() {
            match catalog.get_current(class, sources) {
                Ok(values) => {
                    for value in values {
                        snapshot.insert(class, &value.key, value.value);
                    }
                }
                Err(err) => {
                    warn!(class = class.slug(), error = %err, "class left out of snapshot");
                    failures.push((class, err.to_string()));
                }
            }
        }
        (snapshot, failures)
    }
}

/// Classes spoofed since the last backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoofJournal {
    /// RFC 3339 time of the backup this journal belongs to.
    #[serde(default)]
    pub backup_taken_at: Option<String>,
    #[serde(default)]
    pub spoofed: BTreeSet<IdentifierClass>,
}

impl SpoofJournal {
    pub fn was_spoofed(&self, class: IdentifierClass) -> bool {
        self.spoofed.contains(&class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupReport {
    pub path: PathBuf,
    pub entries: usize,
    pub failed_classes: Vec<(IdentifierClass, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Snapshot keys written back.
    pub restored: Vec<String>,
    /// Restorable keys whose target rejected the value.
    pub failed: Vec<String>,
    /// Keys with a value but no inverse writer.
    pub skipped: usize,
}

impl RestoreReport {
    pub fn restored_count(&self) -> usize {
        self.restored.len()
    }
}

/// File-backed snapshot and journal.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pub snapshot_path: PathBuf,
    pub journal_path: PathBuf,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, SnapshotError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(SnapshotError::Io { path: path.to_path_buf(), source }),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| SnapshotError::Corrupt { path: path.to_path_buf(), source })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|source| SnapshotError::Io { path: path.to_path_buf(), source })
}

impl SnapshotStore {
    pub fn new(snapshot_path: impl Into<PathBuf>, journal_path: impl Into<PathBuf>) -> Self {
        Self { snapshot_path: snapshot_path.into(), journal_path: journal_path.into() }
    }

    pub fn from_layout(layout: &EngineLayout) -> Self {
        Self::new(&layout.snapshot_path, &layout.journal_path)
    }

    /// Capture every class and replace the stored snapshot. Starts a fresh journal.
    pub fn backup(&self, catalog: &Catalog, sources: &Sources) -> EngineResult<BackupReport> {
        let (snapshot, failed_classes) = Snapshot::capture(catalog, sources);
        self.save(&snapshot)?;
        let journal = SpoofJournal {
            backup_taken_at: Some(Utc::now().to_rfc3339()),
            spoofed: BTreeSet::new(),
        };
        write_json(&self.journal_path, &journal)?;
        info!(path = %self.snapshot_path.display(), entries = snapshot.len(), "backup saved");
        Ok(BackupReport {
            path: self.snapshot_path.clone(),
            entries: snapshot.len(),
            failed_classes,
        })
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        write_json(&self.snapshot_path, snapshot)
    }

    /// `Ok(None)` when no backup exists yet.
    pub fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        read_json(&self.snapshot_path)
    }

    /// The journal, or an empty one when none exists.
    pub fn load_journal(&self) -> Result<SpoofJournal, SnapshotError> {
        Ok(read_json(&self.journal_path)?.unwrap_or_default())
    }

    pub fn record_spoof(&self, class: IdentifierClass) -> Result<(), SnapshotError> {
        let mut journal = self.load_journal()?;
        if journal.spoofed.insert(class) {
            write_json(&self.journal_path, &journal)?;
        }
        Ok(())
    }

    /// Write back every snapshot value that has an inverse writer.
    ///
    /// Values go through the field's full write fan-out. Keys of other classes
    /// are skipped silently.
    pub fn restore(
        &self,
        snapshot: &Snapshot,
        catalog: &Catalog,
        sources: &Sources,
        privilege: Privilege,
    ) -> EngineResult<RestoreReport> {
        privilege.require("Restore")?;
        let mut report = RestoreReport::default();
        let mut restored_classes = BTreeSet::new();

        report.skipped = snapshot
            .entries()
            .filter(|(key, value)| {
                let class = key.split('/').next().and_then(IdentifierClass::from_slug);
                value.is_some() && !class.is_some_and(IdentifierClass::restorable)
            })
            .count();

        for class in catalog.list_classes().into_iter().filter(|c| c.restorable()) {
            for field in catalog.fields(class, sources)? {
                let Some(Some(value)) = snapshot.get(class, &field.key) else {
                    continue;
                };
                let key = Snapshot::key(class, &field.key);
                let outcome = write_field(sources, &field, &StoreValue::text(value));
                if outcome.target_applied {
                    restored_classes.insert(class);
                    report.restored.push(key);
                } else {
                    warn!(%key, "restore rejected");
                    report.failed.push(key);
                }
            }
        }

        if !restored_classes.is_empty() {
            let mut journal = self.load_journal()?;
            journal.spoofed.retain(|c| !restored_classes.contains(c));
            write_json(&self.journal_path, &journal)?;
        }
        info!(restored = report.restored_count(), failed = report.failed.len(), "restore finished");
        Ok(report)
    }
}
