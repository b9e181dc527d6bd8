//! Boundaries to the three OS data sources the engine reads and writes.
//!
//! - [`ConfigStore`]: hierarchical per-machine configuration store.
//! - [`InventoryQuery`]: read-only hardware inventory records.
//! - [`LiveState`]: values the running OS reports right now.
//!
//! The engine only ever talks to these traits. [`memory`] provides an in-memory
//! machine for tests and simulation; `windows` talks to the real host.

pub mod fixture;
pub mod memory;
#[cfg(windows)]
pub mod windows;
pub mod wmic;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{BackingLocation, LiveProperty, Locator, StoreValue};

/// Error type for a single source call.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The key or record does not exist (a write target with no parent, for example).
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The location can never be written.
    #[error("Read-only location: {0}")]
    ReadOnly(String),

    /// The OS refused the operation for another reason.
    #[error("Rejected at {location}: {reason}")]
    Rejected { location: String, reason: String },

    /// An external command could not be run or exited unsuccessfully.
    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for source calls.
pub type SourceResult<T> = Result<T, SourceError>;

/// Hierarchical configuration store (paths use `\` separators).
///
/// Reads of missing keys or values return `Ok(None)` / empty lists; only
/// genuine failures are errors.
pub trait ConfigStore {
    fn read(&self, path: &str, name: &str) -> SourceResult<Option<StoreValue>>;
    fn write(&self, path: &str, name: &str, value: &StoreValue) -> SourceResult<()>;
    fn delete(&self, path: &str, name: &str) -> SourceResult<()>;
    fn subkeys(&self, path: &str) -> SourceResult<Vec<String>>;
    fn value_names(&self, path: &str) -> SourceResult<Vec<String>>;
    fn key_exists(&self, path: &str) -> SourceResult<bool>;
}

/// One inventory record: property name to string value.
pub type InventoryRecord = BTreeMap<String, String>;

/// Read-only hardware inventory. An empty result is valid.
pub trait InventoryQuery {
    fn query(&self, class: &str) -> SourceResult<Vec<InventoryRecord>>;
}

/// A network interface as the running OS reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveInterface {
    pub name: String,
    pub description: String,
    /// 12 hex digits when known.
    pub address: Option<String>,
    pub status: String,
}

/// Live OS state and the few live mutations the engine performs.
pub trait LiveState {
    fn hostname(&self) -> SourceResult<String>;
    fn interfaces(&self) -> SourceResult<Vec<LiveInterface>>;
    /// Best-effort; the new name normally only takes effect after a reboot.
    fn set_hostname(&self, name: &str) -> SourceResult<()>;
    fn set_adapters_enabled(&self, enabled: bool) -> SourceResult<()>;
    fn is_elevated(&self) -> bool;
}

/// The three sources bundled for one operation.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub store: &'a dyn ConfigStore,
    pub inventory: &'a dyn InventoryQuery,
    pub live: &'a dyn LiveState,
}

impl<'a> Sources<'a> {
    pub fn new(
        store: &'a dyn ConfigStore,
        inventory: &'a dyn InventoryQuery,
        live: &'a dyn LiveState,
    ) -> Self {
        Self { store, inventory, live }
    }

    /// Read one location, turning any failure into "absent".
    pub fn read_location(&self, location: &BackingLocation) -> Option<StoreValue> {
        match self.try_read(&location.locator) {
            Ok(value) => value,
            Err(err) => {
                debug!(location = %location.locator, error = %err, "location unavailable");
                None
            }
        }
    }

    fn try_read(&self, locator: &Locator) -> SourceResult<Option<StoreValue>> {
        match locator {
            Locator::Store { path, name } => self.store.read(path, name),
            Locator::Inventory { class, property, index } => {
                let records = self.inventory.query(class)?;
                Ok(records
                    .get(*index)
                    .and_then(|record| record.get(property))
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(StoreValue::text))
            }
            Locator::Live(LiveProperty::Hostname) => {
                let name = self.live.hostname()?;
                Ok(Some(name).filter(|n| !n.is_empty()).map(StoreValue::Text))
            }
            Locator::Live(LiveProperty::InterfaceAddress { description }) => {
                let interfaces = self.live.interfaces()?;
                Ok(interfaces
                    .into_iter()
                    .find(|i| i.description.eq_ignore_ascii_case(description))
                    .and_then(|i| i.address)
                    .map(StoreValue::Text))
            }
        }
    }

    /// Write one location.
    pub fn write_location(&self, location: &BackingLocation, value: &StoreValue) -> SourceResult<()> {
        if !location.is_writable() {
            return Err(SourceError::ReadOnly(location.locator.to_string()));
        }
        match &location.locator {
            Locator::Store { path, name } => self.store.write(path, name, value),
            Locator::Live(LiveProperty::Hostname) => {
                self.live.set_hostname(&value.to_display_string())
            }
            other => Err(SourceError::ReadOnly(other.to_string())),
        }
    }
}
