use tracing::{info, warn};

use super::{copy_subtree, paths, SourceAdapter};
use crate::catalog::SpoofResult;
use crate::model::{BackingLocation, Field, IdentifierClass, Locator, ValueFormat};
use crate::sources::{SourceResult, Sources};

/// SMBIOS values as the store reports them, with the inventory property that
/// reflects the same value when one exists.
const FIRMWARE_VALUES: &[(&str, &str, ValueFormat, Option<(&str, &str)>)] = &[
    (
        "SystemManufacturer",
        "System Manufacturer",
        ValueFormat::Manufacturer,
        Some(("Win32_ComputerSystem", "Manufacturer")),
    ),
    (
        "SystemProductName",
        "System Product",
        ValueFormat::SystemProduct,
        Some(("Win32_ComputerSystem", "Model")),
    ),
    ("SystemVersion", "System Version", ValueFormat::SystemVersion, None),
    ("BIOSVendor", "BIOS Vendor", ValueFormat::BiosVendor, Some(("Win32_BIOS", "Manufacturer"))),
    (
        "BIOSVersion",
        "BIOS Version",
        ValueFormat::BiosVersion,
        Some(("Win32_BIOS", "SMBIOSBIOSVersion")),
    ),
    ("BIOSReleaseDate", "BIOS Release Date", ValueFormat::BiosDate, None),
    (
        "BaseBoardManufacturer",
        "Board Manufacturer",
        ValueFormat::Manufacturer,
        Some(("Win32_BaseBoard", "Manufacturer")),
    ),
    (
        "BaseBoardProduct",
        "Board Product",
        ValueFormat::BoardProduct,
        Some(("Win32_BaseBoard", "Product")),
    ),
    ("BaseBoardVersion", "Board Version", ValueFormat::BoardVersion, None),
];

pub const HARDWARE_CONFIG_FIELD: &str = "HardwareConfig";

/// Firmware and board identity.
#[derive(Debug)]
pub struct FirmwareAdapter {
    /// Depth bound for copying the hardware-config subtree.
    pub subtree_depth: usize,
}

impl Default for FirmwareAdapter {
    fn default() -> Self {
        Self { subtree_depth: 8 }
    }
}

impl SourceAdapter for FirmwareAdapter {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::Firmware
    }

    fn fields(&self, _sources: &Sources) -> SourceResult<Vec<Field>> {
        let mut fields: Vec<Field> = FIRMWARE_VALUES
            .iter()
            .map(|(name, label, format, observed)| {
                let field = Field::new(*name, *label, *format)
                    .at(BackingLocation::target(Locator::store(paths::SYSTEM_INFORMATION, *name)))
                    .at(BackingLocation::mirror(Locator::store(paths::BIOS, *name)).best_effort());
                match observed {
                    Some((class, property)) => field
                        .at(BackingLocation::observer(Locator::inventory(*class, *property))),
                    None => field,
                }
            })
            .collect();

        fields.push(
            Field::new("ComputerHardwareId", "Hardware ID", ValueFormat::BracedGuid).at(
                BackingLocation::target(Locator::store(
                    paths::SYSTEM_INFORMATION,
                    "ComputerHardwareId",
                )),
            ),
        );
        fields.push(
            Field::new(HARDWARE_CONFIG_FIELD, "Hardware Config", ValueFormat::Guid)
                .at(BackingLocation::target(Locator::store(paths::HARDWARE_CONFIG, "LastConfig")))
                .only_when_present(),
        );
        fields.push(
            Field::new("BIOSSerial", "BIOS Serial", ValueFormat::Opaque).at(
                BackingLocation::observer(Locator::inventory("Win32_BIOS", "SerialNumber")),
            ),
        );
        Ok(fields)
    }

    /// Give the new hardware-config GUID a copy of the old GUID's subtree.
    fn after_write(&self, sources: &Sources, result: &mut SpoofResult) {
        let Some(change) =
            result.changes.iter().find(|c| c.key == HARDWARE_CONFIG_FIELD && c.target_applied)
        else {
            return;
        };
        let (Some(old), Some(new)) = (change.old.clone(), change.new.clone()) else {
            return;
        };
        let from = paths::join(paths::HARDWARE_CONFIG, old.trim());
        let to = paths::join(paths::HARDWARE_CONFIG, new.trim());
        match sources.store.key_exists(&from) {
            Ok(true) => match copy_subtree(sources, &from, &to, self.subtree_depth) {
                Ok(copied) => {
                    info!(%from, %to, copied, "hardware config copied");
                    result.notes.push(format!("Copied {copied} hardware config values to {new}"));
                }
                Err(err) => {
                    warn!(%from, %to, error = %err, "hardware config copy failed");
                    result.notes.push(format!("Hardware config copy failed: {err}"));
                }
            },
            Ok(false) => result.notes.push(format!("No hardware config subtree for {old}")),
            Err(err) => result.notes.push(format!("Hardware config lookup failed: {err}")),
        }
    }
}
