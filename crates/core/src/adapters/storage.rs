use super::{paths, walk_subtree, SourceAdapter};
use crate::model::{BackingLocation, Field, IdentifierClass, Locator, StoreValue, ValueFormat};
use crate::sources::{SourceResult, Sources};

/// Value names on a device-map node that identify the device.
pub const DEVICE_VALUES: &[&str] = &["SerialNumber", "Identifier", "InquiryData"];

/// Device-enumeration buses holding disks, under the `Enum` key.
pub const ENUM_BUSES: &[&str] = &["IDE", "SCSI"];

/// Multi-string id lists on an enumerated device instance. Shown, never written.
pub const ENUM_VALUES: &[&str] = &["HardwareID", "CompatibleIDs"];

const SERIAL_MAX_LEN: usize = 20;

/// Disk identifiers from the SCSI device map, plus the inventory's disk serials.
#[derive(Debug)]
pub struct StorageAdapter {
    /// Depth bound for the device-map walk (port, bus, target, unit).
    pub max_depth: usize,
}

impl Default for StorageAdapter {
    fn default() -> Self {
        Self { max_depth: 6 }
    }
}

impl SourceAdapter for StorageAdapter {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::StorageSerial
    }

    fn fields(&self, sources: &Sources) -> SourceResult<Vec<Field>> {
        let mut fields = Vec::new();
        if sources.store.key_exists(paths::SCSI_DEVICE_MAP)? {
            for node in walk_subtree(sources, paths::SCSI_DEVICE_MAP, self.max_depth) {
                let relative = node[paths::SCSI_DEVICE_MAP.len()..].trim_start_matches('\\');
                for name in DEVICE_VALUES {
                    let format = match sources.store.read(&node, name) {
                        Ok(Some(StoreValue::Text(_))) => ValueFormat::SerialLike { max_len: SERIAL_MAX_LEN },
                        Ok(Some(StoreValue::Binary(_))) => ValueFormat::HeaderBlob,
                        _ => continue,
                    };
                    let key = paths::join(relative, name);
                    fields.push(
                        Field::new(key.clone(), key, format)
                            .at(BackingLocation::target(Locator::store(&node, *name))),
                    );
                }
            }
        }

        fields.extend(enum_fields(sources)?);

        for (index, _) in sources.inventory.query("Win32_DiskDrive")?.iter().enumerate() {
            fields.push(
                Field::new(
                    format!("Win32_DiskDrive[{index}]"),
                    format!("Disk {index} Serial (inventory)"),
                    ValueFormat::Opaque,
                )
                .at(BackingLocation::observer(Locator::Inventory {
                    class: "Win32_DiskDrive".to_string(),
                    property: "SerialNumber".to_string(),
                    index,
                })),
            );
        }
        Ok(fields)
    }
}

/// Id lists of every `<bus>\<device>\<instance>` key under the IDE and SCSI
/// enumeration trees. Instances without them are skipped.
fn enum_fields(sources: &Sources) -> SourceResult<Vec<Field>> {
    let mut fields = Vec::new();
    for bus in ENUM_BUSES {
        let root = paths::join(paths::DEVICE_ENUM, bus);
        if !sources.store.key_exists(&root)? {
            continue;
        }
        for instance in walk_subtree(sources, &root, 2) {
            let below = instance[root.len()..].trim_start_matches('\\');
            let Some((device, _)) = below.split_once('\\') else {
                continue;
            };
            let friendly = match sources.store.read(&instance, "FriendlyName") {
                Ok(Some(StoreValue::Text(name))) if !name.is_empty() => name,
                _ => device.to_string(),
            };
            for name in ENUM_VALUES {
                match sources.store.read(&instance, name) {
                    Ok(Some(StoreValue::MultiText(ids))) if !ids.is_empty() => {}
                    _ => continue,
                }
                fields.push(
                    Field::new(
                        paths::join(&paths::join(bus, below), name),
                        format!("{friendly} {name}"),
                        ValueFormat::Opaque,
                    )
                    .at(BackingLocation::observer(Locator::store(&instance, *name))),
                );
            }
        }
    }
    Ok(fields)
}
