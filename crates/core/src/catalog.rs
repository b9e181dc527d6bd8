//! Identifier catalog: the registry binding each class to its adapter and generator.
//!
//! The catalog is built once and then only read. The orchestrator, snapshot
//! store and verifier all take it by reference.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::{
    read_field, write_field, ComputerNameAdapter, FirmwareAdapter, LocationError,
    MachineGuidAdapter, NetworkAdapter, ProductAdapter, SourceAdapter, StorageAdapter,
};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::generators;
use crate::model::{CurrentValue, Field, FieldReading, IdentifierClass, StoreValue, ValueFormat};
use crate::snapshot::SnapshotStore;
use crate::sources::Sources;

/// Produces a replacement for a value of the given format.
pub type Generator = fn(&ValueFormat, Option<&StoreValue>, &mut dyn RngCore) -> StoreValue;

/// One registered class.
pub struct CatalogEntry {
    pub class: IdentifierClass,
    pub adapter: Box<dyn SourceAdapter>,
    pub generator: Generator,
}

/// Before/after of one field in a spoof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub key: String,
    pub label: String,
    pub old: Option<String>,
    pub new: Option<String>,
    /// Locations that accepted the value.
    pub applied: usize,
    pub target_applied: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<LocationError>,
}

/// Result of spoofing one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoofResult {
    pub class: IdentifierClass,
    pub changes: Vec<FieldChange>,
    /// Follow-up actions and skipped fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl SpoofResult {
    pub fn new(class: IdentifierClass) -> Self {
        Self { class, changes: Vec::new(), notes: Vec::new() }
    }

    /// Fields whose authoritative location took the new value.
    pub fn identifiers_changed(&self) -> usize {
        self.changes.iter().filter(|c| c.target_applied).count()
    }

    pub fn locations_changed(&self) -> usize {
        self.changes.iter().map(|c| c.applied).sum()
    }
}

/// Outcome of one class in a multi-class run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOutcome {
    pub class: IdentifierClass,
    pub result: Result<SpoofResult, String>,
}

/// Generate a value for `field` that differs from `original`. Gives up after a
/// few attempts for formats with a tiny value space.
fn fresh_value(
    generator: Generator,
    field: &Field,
    original: Option<&StoreValue>,
    rng: &mut dyn RngCore,
) -> StoreValue {
    const ATTEMPTS: usize = 8;
    let previous = original.map(|v| field.format.render(v));
    let mut value = generator(&field.format, original, rng);
    for _ in 1..ATTEMPTS {
        match &previous {
            Some(old) if field.format.same_value(old, &field.format.render(&value)) => {
                value = generator(&field.format, original, rng);
            }
            _ => break,
        }
    }
    value
}

/// Registry of identifier classes, iterated in the fixed class order.
#[derive(Default)]
pub struct Catalog {
    entries: BTreeMap<IdentifierClass, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Register `adapter` with the default format-driven generator.
    pub fn register<A: SourceAdapter + 'static>(&mut self, adapter: A) -> &mut Self {
        self.register_with(adapter, generators::generate)
    }

    pub fn register_with<A: SourceAdapter + 'static>(
        &mut self,
        adapter: A,
        generator: Generator,
    ) -> &mut Self {
        let class = adapter.class();
        self.entries.insert(class, CatalogEntry { class, adapter: Box::new(adapter), generator });
        self
    }

    /// Catalog with all six classes, tuned by `config`.
    pub fn standard(config: &EngineConfig) -> Self {
        let mut catalog = Catalog::new();
        catalog
            .register(MachineGuidAdapter)
            .register(ComputerNameAdapter)
            .register(FirmwareAdapter { subtree_depth: config.subtree_depth })
            .register(NetworkAdapter {
                markers: config.virtual_adapter_markers.clone(),
                restart_pause: config.adapter_restart_pause(),
            })
            .register(StorageAdapter { max_depth: config.subtree_depth })
            .register(ProductAdapter);
        catalog
    }

    pub fn list_classes(&self) -> Vec<IdentifierClass> {
        self.entries.keys().copied().collect()
    }

    pub fn entry(&self, class: IdentifierClass) -> EngineResult<&CatalogEntry> {
        self.entries.get(&class).ok_or_else(|| EngineError::UnknownClass(class.slug().to_string()))
    }

    pub fn fields(&self, class: IdentifierClass, sources: &Sources) -> EngineResult<Vec<Field>> {
        self.entry(class)?
            .adapter
            .fields(sources)
            .map_err(|source| EngineError::Enumerate { class, source })
    }

    /// Read every field of `class` at every location.
    pub fn read(&self, class: IdentifierClass, sources: &Sources) -> EngineResult<Vec<FieldReading>> {
        Ok(self.fields(class, sources)?.iter().map(|f| read_field(sources, f)).collect())
    }

    /// Ordered label/value pairs of the class's effective current values.
    pub fn get_current(
        &self,
        class: IdentifierClass,
        sources: &Sources,
    ) -> EngineResult<Vec<CurrentValue>> {
        Ok(self
            .read(class, sources)?
            .into_iter()
            .map(|reading| CurrentValue {
                value: reading.current_display(),
                key: reading.field.key,
                label: reading.field.label,
            })
            .collect())
    }

    /// Generate one value per writable field and write it everywhere it lives.
    pub fn spoof(
        &self,
        class: IdentifierClass,
        sources: &Sources,
        rng: &mut dyn RngCore,
    ) -> EngineResult<SpoofResult> {
        let entry = self.entry(class)?;
        let mut result = SpoofResult::new(class);
        for reading in self.read(class, sources)? {
            let field = &reading.field;
            if !field.is_writable() {
                continue;
            }
            if field.require_existing && reading.target_value().is_none() {
                debug!(field = %field.key, "absent, skipped");
                result.notes.push(format!("{}: not present, skipped", field.label));
                continue;
            }
            let original = reading.current().cloned();
            let value = fresh_value(entry.generator, field, original.as_ref(), rng);
            let outcome = write_field(sources, field, &value);
            result.changes.push(FieldChange {
                key: field.key.clone(),
                label: field.label.clone(),
                old: original.as_ref().map(|v| field.format.render(v)),
                new: Some(field.format.render(&value)),
                applied: outcome.applied,
                target_applied: outcome.target_applied,
                errors: outcome.errors,
            });
        }
        entry.adapter.after_write(sources, &mut result);
        info!(
            class = class.slug(),
            identifiers = result.identifiers_changed(),
            locations = result.locations_changed(),
            "class spoofed"
        );
        Ok(result)
    }

    /// Spoof every class in order; a failing class does not stop the others.
    /// Classes that spoof are recorded in `journal` when one is given.
    pub fn spoof_all(
        &self,
        sources: &Sources,
        rng: &mut dyn RngCore,
        journal: Option<&SnapshotStore>,
    ) -> Vec<ClassOutcome> {
        self.spoof_classes(&self.list_classes(), sources, rng, journal)
    }

    /// Spoof `classes` in the given order, best effort.
    pub fn spoof_classes(
        &self,
        classes: &[IdentifierClass],
        sources: &Sources,
        rng: &mut dyn RngCore,
        journal: Option<&SnapshotStore>,
    ) -> Vec<ClassOutcome> {
        let mut outcomes = Vec::with_capacity(classes.len());
        for &class in classes {
            let result = self.spoof(class, sources, rng);
            if let (Ok(_), Some(store)) = (&result, journal) {
                if let Err(err) = store.record_spoof(class) {
                    warn!(class = class.slug(), error = %err, "journal not updated");
                }
            }
            outcomes.push(ClassOutcome {
                class,
                result: result.map_err(|err| {
                    warn!(class = class.slug(), error = %err, "class spoof failed");
                    err.to_string()
                }),
            });
        }
        outcomes
    }
}
