//! Per-class source adapters.
//!
//! An adapter knows which fields a class has on this machine and where each of
//! them lives. Reading and writing go through the shared helpers here so every
//! class gets the same fan-out and failure semantics: one value per field goes
//! to every writable location, failures are recorded per location, and a failed
//! location never stops its siblings.

pub mod computer_name;
pub mod firmware;
pub mod machine_guid;
pub mod network;
pub mod paths;
pub mod product;
pub mod storage;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::SpoofResult;
use crate::model::{Field, FieldReading, IdentifierClass, LocationRole, Observation, StoreValue};
use crate::sources::{SourceResult, Sources};

pub use computer_name::ComputerNameAdapter;
pub use firmware::FirmwareAdapter;
pub use machine_guid::MachineGuidAdapter;
pub use network::NetworkAdapter;
pub use product::ProductAdapter;
pub use storage::StorageAdapter;

/// Reader/writer for one identifier class.
pub trait SourceAdapter {
    fn class(&self) -> IdentifierClass;

    /// Discover the class's fields on this machine.
    fn fields(&self, sources: &Sources) -> SourceResult<Vec<Field>>;

    /// Follow-up work once the class's fields have been written.
    fn after_write(&self, _sources: &Sources, _result: &mut SpoofResult) {}
}

/// Read every location of `field`.
pub fn read_field(sources: &Sources, field: &Field) -> FieldReading {
    let observations = field
        .locations
        .iter()
        .map(|location| Observation {
            location: location.clone(),
            value: sources.read_location(location),
        })
        .collect();
    FieldReading { field: field.clone(), observations }
}

/// A write failure at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationError {
    pub location: String,
    pub error: String,
}

/// What a fan-out write achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Locations written successfully.
    pub applied: usize,
    /// Whether at least one target location took the value.
    pub target_applied: bool,
    /// Failures at locations that are not best-effort.
    pub errors: Vec<LocationError>,
}

/// Write `value` to every writable location of `field`.
pub fn write_field(sources: &Sources, field: &Field, value: &StoreValue) -> WriteOutcome {
    let mut outcome = WriteOutcome::default();
    for location in field.locations.iter().filter(|l| l.is_writable()) {
        match sources.write_location(location, value) {
            Ok(()) => {
                debug!(field = %field.key, location = %location.locator, "written");
                outcome.applied += 1;
                if location.role == LocationRole::Target {
                    outcome.target_applied = true;
                }
            }
            Err(err) if location.best_effort => {
                debug!(field = %field.key, location = %location.locator, error = %err, "best-effort write skipped");
            }
            Err(err) => {
                warn!(field = %field.key, location = %location.locator, error = %err, "write rejected");
                outcome.errors.push(LocationError {
                    location: location.locator.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }
    outcome
}

/// Collect `root` and every key below it, breadth first, no deeper than
/// `max_depth` levels under `root`. Unreadable keys are skipped.
pub fn walk_subtree(sources: &Sources, root: &str, max_depth: usize) -> Vec<String> {
    let mut found = Vec::new();
    let mut worklist = std::collections::VecDeque::from([(root.to_string(), 0usize)]);
    while let Some((path, depth)) = worklist.pop_front() {
        if depth < max_depth {
            match sources.store.subkeys(&path) {
                Ok(children) => worklist.extend(
                    children.into_iter().map(|child| (paths::join(&path, &child), depth + 1)),
                ),
                Err(err) => debug!(%path, error = %err, "subtree walk skipped key"),
            }
        }
        found.push(path);
    }
    found
}

/// Copy every value under `from` to the same relative path under `to`.
/// Returns how many values were copied.
pub fn copy_subtree(
    sources: &Sources,
    from: &str,
    to: &str,
    max_depth: usize,
) -> SourceResult<usize> {
    let mut copied = 0;
    for path in walk_subtree(sources, from, max_depth) {
        let relative = path[from.len()..].trim_start_matches('\\');
        let dest = if relative.is_empty() { to.to_string() } else { paths::join(to, relative) };
        // Keys without values are recreated implicitly by their descendants' writes.
        for name in sources.store.value_names(&path)? {
            if let Some(value) = sources.store.read(&path, &name)? {
                sources.store.write(&dest, &name, &value)?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}
