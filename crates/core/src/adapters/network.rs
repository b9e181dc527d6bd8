use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{paths, SourceAdapter};
use crate::catalog::SpoofResult;
use crate::model::{BackingLocation, Field, IdentifierClass, LiveProperty, Locator, ValueFormat};
use crate::sources::{SourceResult, Sources};

/// Substrings identifying virtual, VPN and tunnel adapters.
pub const DEFAULT_VIRTUAL_MARKERS: &[&str] = &[
    "virtual",
    "vmware",
    "virtualbox",
    "hyper-v",
    "vpn",
    "tunnel",
    "tap-windows",
    "wintun",
    "wireguard",
    "loopback",
    "miniport",
    "teredo",
    "isatap",
];

/// True when `description` or `component_id` contains any marker (case-insensitive).
pub fn is_virtual_adapter(description: &str, component_id: &str, markers: &[String]) -> bool {
    let description = description.to_lowercase();
    let component_id = component_id.to_lowercase();
    markers.iter().map(|m| m.to_lowercase()).any(|marker| {
        !marker.is_empty() && (description.contains(&marker) || component_id.contains(&marker))
    })
}

/// Physical network adapter addresses.
#[derive(Debug)]
pub struct NetworkAdapter {
    pub markers: Vec<String>,
    /// Pause after disabling and after re-enabling adapters.
    pub restart_pause: Duration,
}

impl Default for NetworkAdapter {
    fn default() -> Self {
        Self {
            markers: DEFAULT_VIRTUAL_MARKERS.iter().map(|m| m.to_string()).collect(),
            restart_pause: Duration::from_millis(2000),
        }
    }
}

impl NetworkAdapter {
    fn restart_adapters(&self, sources: &Sources) -> Result<(), String> {
        sources.live.set_adapters_enabled(false).map_err(|e| e.to_string())?;
        thread::sleep(self.restart_pause);
        sources.live.set_adapters_enabled(true).map_err(|e| e.to_string())?;
        thread::sleep(self.restart_pause);
        Ok(())
    }
}

impl SourceAdapter for NetworkAdapter {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::NetworkAddress
    }

    fn fields(&self, sources: &Sources) -> SourceResult<Vec<Field>> {
        let mut fields = Vec::new();
        for subkey in sources.store.subkeys(paths::ADAPTER_CLASS)? {
            if subkey.is_empty() || !subkey.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let key = paths::join(paths::ADAPTER_CLASS, &subkey);
            let text = |name: &str| {
                sources
                    .store
                    .read(&key, name)
                    .ok()
                    .flatten()
                    .map(|v| v.to_display_string().trim().to_string())
                    .unwrap_or_default()
            };
            let description = text("DriverDesc");
            if description.is_empty() {
                continue;
            }
            if is_virtual_adapter(&description, &text("ComponentId"), &self.markers) {
                debug!(%subkey, %description, "virtual adapter excluded");
                continue;
            }
            fields.push(
                Field::new(
                    format!("{subkey}|{description}"),
                    description.clone(),
                    ValueFormat::MacAddress,
                )
                .at(BackingLocation::target(Locator::store(&key, "NetworkAddress")))
                .at(BackingLocation::fallback(Locator::store(&key, "OriginalNetworkAddress")))
                .at(BackingLocation::observer(Locator::Live(LiveProperty::InterfaceAddress {
                    description,
                }))),
            );
        }
        Ok(fields)
    }

    /// Restart adapters so the new addresses are picked up.
    fn after_write(&self, sources: &Sources, result: &mut SpoofResult) {
        if !result.changes.iter().any(|c| c.target_applied) {
            return;
        }
        match self.restart_adapters(sources) {
            Ok(()) => {
                info!("network adapters restarted");
                result.notes.push("Network adapters restarted".to_string());
            }
            Err(err) => {
                warn!(error = %err, "adapter restart failed");
                result.notes.push(format!("Adapter restart failed, reboot to apply: {err}"));
            }
        }
    }
}
