//! Native Windows sources: the registry through `winreg`, inventory and live
//! state through the stock command-line tools.

use std::io;
use std::process::Command;

use tracing::debug;
use winreg::enums::{
    RegType, HKEY_LOCAL_MACHINE, KEY_READ, KEY_WRITE, REG_DWORD, REG_EXPAND_SZ, REG_MULTI_SZ,
    REG_SZ,
};
use winreg::{RegKey, RegValue};

use super::wmic::{parse_getmac_csv, parse_list_output};
use super::{
    ConfigStore, InventoryQuery, InventoryRecord, LiveInterface, LiveState, SourceError,
    SourceResult,
};
use crate::model::StoreValue;

fn map_io(err: io::Error, location: String) -> SourceError {
    match err.kind() {
        io::ErrorKind::NotFound => SourceError::NotFound(location),
        io::ErrorKind::PermissionDenied => SourceError::AccessDenied(location),
        _ => SourceError::Rejected { location, reason: err.to_string() },
    }
}

/// Run a tool and return its stdout, failing on a non-zero exit.
fn run(program: &str, args: &[&str]) -> SourceResult<String> {
    let command = format!("{program} {}", args.join(" "));
    debug!(%command, "running");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| SourceError::Command { command: command.clone(), reason: e.to_string() })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(SourceError::Command { command, reason: format!("{} {stderr}", output.status) });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// The local-machine registry hive.
pub struct RegistryStore {
    hklm: RegKey,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self { hklm: RegKey::predef(HKEY_LOCAL_MACHINE) }
    }

    fn open(&self, path: &str) -> SourceResult<Option<RegKey>> {
        match self.hklm.open_subkey_with_flags(path, KEY_READ) {
            Ok(key) => Ok(Some(key)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io(e, path.to_string())),
        }
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for RegistryStore {
    fn read(&self, path: &str, name: &str) -> SourceResult<Option<StoreValue>> {
        let Some(key) = self.open(path)? else {
            return Ok(None);
        };
        let location = format!("{path}\\{name}");
        let raw = match key.get_raw_value(name) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(map_io(e, location)),
        };
        let value = match raw.vtype {
            REG_SZ | REG_EXPAND_SZ => key.get_value::<String, _>(name).map(StoreValue::Text),
            REG_MULTI_SZ => key.get_value::<Vec<String>, _>(name).map(StoreValue::MultiText),
            REG_DWORD => key.get_value::<u32, _>(name).map(StoreValue::Dword),
            _ => Ok(StoreValue::Binary(raw.bytes)),
        };
        value.map(Some).map_err(|e| map_io(e, location))
    }

    fn write(&self, path: &str, name: &str, value: &StoreValue) -> SourceResult<()> {
        let location = format!("{path}\\{name}");
        let (key, _) = self.hklm.create_subkey(path).map_err(|e| map_io(e, location.clone()))?;
        let result = match value {
            StoreValue::Text(s) => key.set_value(name, s),
            StoreValue::MultiText(items) => key.set_value(name, items),
            StoreValue::Dword(n) => key.set_value(name, n),
            StoreValue::Binary(bytes) => key.set_raw_value(
                name,
                &RegValue { bytes: bytes.clone(), vtype: RegType::REG_BINARY },
            ),
        };
        result.map_err(|e| map_io(e, location))
    }

    fn delete(&self, path: &str, name: &str) -> SourceResult<()> {
        let location = format!("{path}\\{name}");
        let key = self
            .hklm
            .open_subkey_with_flags(path, KEY_READ | KEY_WRITE)
            .map_err(|e| map_io(e, location.clone()))?;
        match key.delete_value(name) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(e, location)),
        }
    }

    fn subkeys(&self, path: &str) -> SourceResult<Vec<String>> {
        let Some(key) = self.open(path)? else {
            return Ok(Vec::new());
        };
        key.enum_keys()
            .collect::<io::Result<Vec<String>>>()
            .map_err(|e| map_io(e, path.to_string()))
    }

    fn value_names(&self, path: &str) -> SourceResult<Vec<String>> {
        let Some(key) = self.open(path)? else {
            return Ok(Vec::new());
        };
        key.enum_values()
            .map(|entry| entry.map(|(name, _)| name))
            .collect::<io::Result<Vec<String>>>()
            .map_err(|e| map_io(e, path.to_string()))
    }

    fn key_exists(&self, path: &str) -> SourceResult<bool> {
        Ok(self.open(path)?.is_some())
    }
}

/// Inventory through `wmic path <class> get * /format:list`.
#[derive(Debug, Default)]
pub struct WmicInventory;

impl InventoryQuery for WmicInventory {
    fn query(&self, class: &str) -> SourceResult<Vec<InventoryRecord>> {
        let out = run("wmic", &["path", class, "get", "*", "/format:list"])?;
        Ok(parse_list_output(&out))
    }
}

/// Live host state through `hostname`, `getmac`, `wmic`, `netsh` and `net`.
#[derive(Debug, Default)]
pub struct HostLiveState;

impl LiveState for HostLiveState {
    fn hostname(&self) -> SourceResult<String> {
        Ok(run("hostname", &[])?.trim().to_string())
    }

    fn interfaces(&self) -> SourceResult<Vec<LiveInterface>> {
        let out = run("getmac", &["/v", "/fo", "csv", "/nh"])?;
        Ok(parse_getmac_csv(&out))
    }

    fn set_hostname(&self, name: &str) -> SourceResult<()> {
        let current = self.hostname()?;
        let filter = format!("name='{current}'");
        let rename = format!("name={name}");
        let out = run("wmic", &["computersystem", "where", &filter, "call", "rename", &rename])?;
        if out.contains("ReturnValue = 0") {
            Ok(())
        } else {
            Err(SourceError::Rejected {
                location: "live hostname".to_string(),
                reason: out.trim().to_string(),
            })
        }
    }

    fn set_adapters_enabled(&self, enabled: bool) -> SourceResult<()> {
        let admin = if enabled { "admin=enable" } else { "admin=disable" };
        let mut failures = Vec::new();
        for iface in self.interfaces()? {
            let name = format!("name={}", iface.name);
            if let Err(err) = run("netsh", &["interface", "set", "interface", &name, admin]) {
                failures.push(format!("{}: {err}", iface.name));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SourceError::Rejected {
                location: "network adapters".to_string(),
                reason: failures.join("; "),
            })
        }
    }

    fn is_elevated(&self) -> bool {
        Command::new("net")
            .arg("session")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}
