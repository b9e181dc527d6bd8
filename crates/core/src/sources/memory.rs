//! In-memory machine implementing all three source traits.
//!
//! Used by the test suites and by the CLI's simulation mode. Store paths and
//! value names are matched case-insensitively, like the real store. Writing a
//! value creates the key and all of its ancestors.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::fixture::MachineFixture;
use super::{
    ConfigStore, InventoryQuery, InventoryRecord, LiveInterface, LiveState, SourceError,
    SourceResult, Sources,
};
use crate::adapters::paths;
use crate::model::StoreValue;

#[derive(Debug, Clone, Default)]
struct KeyNode {
    path: String,
    /// Lowercased value name to (original name, value).
    values: BTreeMap<String, (String, StoreValue)>,
}

fn normalize(path: &str) -> String {
    path.trim_matches('\\').to_ascii_lowercase()
}

/// A simulated machine.
#[derive(Debug, Default)]
pub struct MemoryMachine {
    keys: RefCell<BTreeMap<String, KeyNode>>,
    inventory: BTreeMap<String, Vec<InventoryRecord>>,
    hostname: RefCell<String>,
    pending_hostname: RefCell<Option<String>>,
    interfaces: RefCell<Vec<LiveInterface>>,
    elevated: bool,
    read_only_paths: Vec<String>,
    fail_set_hostname: bool,
    adapter_toggles: Cell<usize>,
}

impl MemoryMachine {
    pub fn from_fixture(fixture: MachineFixture) -> Self {
        let machine = MemoryMachine {
            inventory: fixture.inventory,
            hostname: RefCell::new(fixture.hostname),
            pending_hostname: RefCell::new(fixture.pending_hostname),
            interfaces: RefCell::new(fixture.interfaces),
            elevated: fixture.elevated,
            read_only_paths: fixture.read_only_paths.iter().map(|p| normalize(p)).collect(),
            fail_set_hostname: fixture.fail_set_hostname,
            ..Default::default()
        };
        for (path, values) in fixture.store {
            machine.ensure_key(&path);
            let mut keys = machine.keys.borrow_mut();
            if let Some(node) = keys.get_mut(&normalize(&path)) {
                for (name, value) in values {
                    node.values.insert(name.to_ascii_lowercase(), (name, value));
                }
            }
        }
        machine
    }

    /// Load a fixture from a JSON file.
    pub fn load(path: &Path) -> SourceResult<Self> {
        let raw = fs::read_to_string(path)?;
        let fixture: MachineFixture = serde_json::from_str(&raw).map_err(|e| {
            SourceError::Rejected { location: path.display().to_string(), reason: e.to_string() }
        })?;
        Ok(Self::from_fixture(fixture))
    }

    /// Persist the current state as a fixture.
    pub fn save(&self, path: &Path) -> SourceResult<()> {
        let json = serde_json::to_string_pretty(&self.to_fixture()).map_err(|e| {
            SourceError::Rejected { location: path.display().to_string(), reason: e.to_string() }
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn to_fixture(&self) -> MachineFixture {
        let store = self
            .keys
            .borrow()
            .values()
            .map(|node| {
                let values =
                    node.values.values().map(|(name, value)| (name.clone(), value.clone())).collect();
                (node.path.clone(), values)
            })
            .collect();
        MachineFixture {
            store,
            inventory: self.inventory.clone(),
            hostname: self.hostname.borrow().clone(),
            pending_hostname: self.pending_hostname.borrow().clone(),
            interfaces: self.interfaces.borrow().clone(),
            elevated: self.elevated,
            read_only_paths: self.read_only_paths.clone(),
            fail_set_hostname: self.fail_set_hostname,
        }
    }

    pub fn sources(&self) -> Sources<'_> {
        Sources::new(self, self, self)
    }

    /// Number of times adapters were disabled or enabled.
    pub fn adapter_toggles(&self) -> usize {
        self.adapter_toggles.get()
    }

    pub fn pending_hostname(&self) -> Option<String> {
        self.pending_hostname.borrow().clone()
    }

    /// Apply what a reboot would: the pending computer name becomes active and live.
    pub fn reboot(&self) {
        let pending = self
            .read(paths::COMPUTER_NAME_PENDING, "ComputerName")
            .ok()
            .flatten()
            .map(|v| v.to_display_string())
            .or_else(|| self.pending_hostname.borrow().clone());
        if let Some(name) = pending {
            self.put(paths::COMPUTER_NAME_ACTIVE, "ComputerName", StoreValue::text(name.as_str()));
            *self.hostname.borrow_mut() = name;
        }
        *self.pending_hostname.borrow_mut() = None;
        self.sync_interface_addresses();
    }

    fn ensure_key(&self, path: &str) {
        let mut keys = self.keys.borrow_mut();
        let trimmed = path.trim_matches('\\');
        let mut prefix = String::new();
        for segment in trimmed.split('\\').filter(|s| !s.is_empty()) {
            prefix = paths::join(&prefix, segment);
            keys.entry(prefix.to_ascii_lowercase())
                .or_insert_with(|| KeyNode { path: prefix.clone(), values: BTreeMap::new() });
        }
    }

    fn put(&self, path: &str, name: &str, value: StoreValue) {
        self.ensure_key(path);
        if let Some(node) = self.keys.borrow_mut().get_mut(&normalize(path)) {
            node.values.insert(name.to_ascii_lowercase(), (name.to_string(), value));
        }
    }

    fn is_read_only(&self, path: &str) -> bool {
        let path = normalize(path);
        self.read_only_paths
            .iter()
            .any(|ro| path == *ro || path.starts_with(&format!("{ro}\\")))
    }

    /// Re-read every adapter's configured address, the way a restart does.
    fn sync_interface_addresses(&self) {
        let Ok(subkeys) = self.subkeys(paths::ADAPTER_CLASS) else {
            return;
        };
        for subkey in subkeys {
            let key = paths::join(paths::ADAPTER_CLASS, &subkey);
            let desc = self.read(&key, "DriverDesc").ok().flatten();
            let address = self.read(&key, "NetworkAddress").ok().flatten();
            if let (Some(desc), Some(address)) = (desc, address) {
                let desc = desc.to_display_string();
                for iface in self.interfaces.borrow_mut().iter_mut() {
                    if iface.description.eq_ignore_ascii_case(&desc) {
                        iface.address = Some(address.to_display_string());
                    }
                }
            }
        }
    }
}

impl ConfigStore for MemoryMachine {
    fn read(&self, path: &str, name: &str) -> SourceResult<Option<StoreValue>> {
        Ok(self
            .keys
            .borrow()
            .get(&normalize(path))
            .and_then(|node| node.values.get(&name.to_ascii_lowercase()))
            .map(|(_, value)| value.clone()))
    }

    fn write(&self, path: &str, name: &str, value: &StoreValue) -> SourceResult<()> {
        if self.is_read_only(path) {
            return Err(SourceError::AccessDenied(format!("{path}\\{name}")));
        }
        self.put(path, name, value.clone());
        Ok(())
    }

    fn delete(&self, path: &str, name: &str) -> SourceResult<()> {
        if self.is_read_only(path) {
            return Err(SourceError::AccessDenied(format!("{path}\\{name}")));
        }
        if let Some(node) = self.keys.borrow_mut().get_mut(&normalize(path)) {
            node.values.remove(&name.to_ascii_lowercase());
        }
        Ok(())
    }

    fn subkeys(&self, path: &str) -> SourceResult<Vec<String>> {
        let prefix = format!("{}\\", normalize(path));
        Ok(self
            .keys
            .borrow()
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix) && !key[prefix.len()..].contains('\\'))
            .map(|(_, node)| node.path.rsplit('\\').next().unwrap_or_default().to_string())
            .collect())
    }

    fn value_names(&self, path: &str) -> SourceResult<Vec<String>> {
        Ok(self
            .keys
            .borrow()
            .get(&normalize(path))
            .map(|node| node.values.values().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default())
    }

    fn key_exists(&self, path: &str) -> SourceResult<bool> {
        Ok(self.keys.borrow().contains_key(&normalize(path)))
    }
}

impl InventoryQuery for MemoryMachine {
    fn query(&self, class: &str) -> SourceResult<Vec<InventoryRecord>> {
        Ok(self
            .inventory
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(class))
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }
}

impl LiveState for MemoryMachine {
    fn hostname(&self) -> SourceResult<String> {
        Ok(self.hostname.borrow().clone())
    }

    fn interfaces(&self) -> SourceResult<Vec<LiveInterface>> {
        Ok(self.interfaces.borrow().clone())
    }

    fn set_hostname(&self, name: &str) -> SourceResult<()> {
        if self.fail_set_hostname || !self.elevated {
            return Err(SourceError::Rejected {
                location: "live hostname".to_string(),
                reason: "rename refused".to_string(),
            });
        }
        *self.pending_hostname.borrow_mut() = Some(name.to_string());
        Ok(())
    }

    fn set_adapters_enabled(&self, enabled: bool) -> SourceResult<()> {
        self.adapter_toggles.set(self.adapter_toggles.get() + 1);
        let status = if enabled { "Up" } else { "Disabled" };
        for iface in self.interfaces.borrow_mut().iter_mut() {
            if iface.status != "Disconnected" {
                iface.status = status.to_string();
            }
        }
        if enabled {
            self.sync_interface_addresses();
        }
        Ok(())
    }

    fn is_elevated(&self) -> bool {
        self.elevated
    }
}
