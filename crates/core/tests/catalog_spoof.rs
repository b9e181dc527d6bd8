mod common;

use hwid_core::adapters::paths;
use hwid_core::model::{StoreValue, ValueFormat};
use hwid_core::sources::fixture::MachineFixture;
use hwid_core::sources::memory::MemoryMachine;
use hwid_core::sources::{ConfigStore, LiveState};
use hwid_core::IdentifierClass;

use common::{catalog, rng, sample_machine};

fn current_of(machine: &MemoryMachine, class: IdentifierClass, key: &str) -> Option<String> {
    catalog()
        .get_current(class, &machine.sources())
        .expect("get_current")
        .into_iter()
        .find(|v| v.key == key)
        .and_then(|v| v.value)
}

/// get_current returns each class in the fixed order with the fixture's values.
#[test]
fn get_current_lists_every_class_in_order() {
    let machine = sample_machine();
    let catalog = catalog();
    assert_eq!(catalog.list_classes(), IdentifierClass::ALL.to_vec());

    let guid = catalog
        .get_current(IdentifierClass::MachineGuid, &machine.sources())
        .expect("machine guid");
    assert_eq!(guid.len(), 1);
    assert_eq!(guid[0].value.as_deref(), Some("3f2504e0-4f89-41d3-9a0c-0305e82c3301"));

    let name = catalog
        .get_current(IdentifierClass::ComputerName, &machine.sources())
        .expect("computer name");
    assert_eq!(name[0].value.as_deref(), Some("DESKTOP-ORIG001"));
}

/// Virtual, VPN and tunnel adapters are excluded from both reads and writes.
#[test]
fn virtual_adapters_are_never_listed_or_written() {
    let machine = sample_machine();
    let catalog = catalog();
    let keys: Vec<String> = catalog
        .get_current(IdentifierClass::NetworkAddress, &machine.sources())
        .expect("network")
        .into_iter()
        .map(|v| v.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "0001|Intel(R) Ethernet Connection I219-V".to_string(),
            "0003|Realtek PCIe GbE Family Controller".to_string(),
        ]
    );

    let result = catalog
        .spoof(IdentifierClass::NetworkAddress, &machine.sources(), &mut rng(1))
        .expect("spoof network");
    assert_eq!(result.changes.len(), 2);
    for subkey in ["0000", "0002", "0004"] {
        let key = paths::join(paths::ADAPTER_CLASS, subkey);
        assert_eq!(machine.read(&key, "NetworkAddress").expect("read"), None, "{subkey}");
    }
}

/// An adapter with no NetworkAddress shows its OriginalNetworkAddress instead.
#[test]
fn adapter_without_address_falls_back_to_original() {
    let machine = sample_machine();
    assert_eq!(
        current_of(&machine, IdentifierClass::NetworkAddress, "0001|Intel(R) Ethernet Connection I219-V")
            .as_deref(),
        Some("3C7C3F1A2B4C")
    );
}

/// Spoofed addresses have the locally-administered bit set and the multicast bit clear,
/// and the adapters are restarted afterwards.
#[test]
fn generated_addresses_are_locally_administered_unicast() {
    let machine = sample_machine();
    let result = catalog()
        .spoof(IdentifierClass::NetworkAddress, &machine.sources(), &mut rng(7))
        .expect("spoof network");
    for change in &result.changes {
        let new = change.new.as_deref().expect("new address");
        assert!(ValueFormat::MacAddress.is_well_formed(new), "{new}");
        let first = u8::from_str_radix(&new[..2], 16).expect("hex octet");
        assert_eq!(first & 0x02, 0x02, "locally administered: {new}");
        assert_eq!(first & 0x01, 0x00, "unicast: {new}");
        assert!(change.target_applied);
    }
    assert!(result.notes.iter().any(|n| n.contains("restarted")));
    assert_eq!(machine.adapter_toggles(), 2);

    let live = machine.interfaces().expect("interfaces");
    let intel = live.iter().find(|i| i.name == "Ethernet").expect("intel");
    assert_eq!(intel.address.as_deref(), result.changes[0].new.as_deref());
}

/// A new computer name reaches the pending name, both Tcpip values and the live hostname.
#[test]
fn computer_name_fans_out_to_mirrors() {
    let machine = sample_machine();
    let result = catalog()
        .spoof(IdentifierClass::ComputerName, &machine.sources(), &mut rng(3))
        .expect("spoof name");
    let change = &result.changes[0];
    let new = change.new.clone().expect("new name");
    assert!(new.starts_with("DESKTOP-"));
    assert_eq!(change.old.as_deref(), Some("DESKTOP-ORIG001"));
    assert_eq!(change.applied, 4);
    assert!(change.errors.is_empty());

    let tcpip = |name: &str| {
        machine
            .read(paths::TCPIP_PARAMETERS, name)
            .expect("read")
            .map(|v| v.to_display_string())
    };
    assert_eq!(tcpip("Hostname").as_deref(), Some(new.as_str()));
    assert_eq!(tcpip("NV Hostname").as_deref(), Some(new.as_str()));
    assert_eq!(machine.pending_hostname().as_deref(), Some(new.as_str()));
    // Active name is observed, not written.
    assert_eq!(
        machine.read(paths::COMPUTER_NAME_ACTIVE, "ComputerName").expect("read"),
        Some(StoreValue::text("DESKTOP-ORIG001"))
    );

    machine.reboot();
    assert_eq!(machine.hostname().expect("hostname"), new);
}

/// A failing live rename is best effort: the store writes still count and no error is kept.
#[test]
fn rejected_live_rename_is_recorded_but_not_fatal() {
    let fixture = MachineFixture { fail_set_hostname: true, ..MachineFixture::sample() };
    let machine = MemoryMachine::from_fixture(fixture);
    let result = catalog()
        .spoof(IdentifierClass::ComputerName, &machine.sources(), &mut rng(3))
        .expect("spoof name");
    let change = &result.changes[0];
    assert!(change.target_applied);
    assert_eq!(change.applied, 3);
    // Best-effort locations do not report errors.
    assert!(change.errors.is_empty());
}

/// A mirror that rejects writes is reported per location while the target still changes.
#[test]
fn read_only_mirror_records_error_and_keeps_going() {
    let fixture = MachineFixture {
        read_only_paths: vec![r"SYSTEM\CurrentControlSet\Services\Tcpip".to_string()],
        ..MachineFixture::sample()
    };
    let machine = MemoryMachine::from_fixture(fixture);
    let result = catalog()
        .spoof(IdentifierClass::ComputerName, &machine.sources(), &mut rng(5))
        .expect("spoof name");
    let change = &result.changes[0];
    assert!(change.target_applied);
    assert_eq!(change.errors.len(), 2);
    assert!(change.errors.iter().all(|e| e.location.contains("Hostname")));
}

/// The HardwareConfig subtree is copied under the new GUID and the BIOS mirror is updated.
#[test]
fn firmware_copies_hardware_config_subtree() {
    let machine = sample_machine();
    let result = catalog()
        .spoof(IdentifierClass::Firmware, &machine.sources(), &mut rng(11))
        .expect("spoof firmware");

    let change = result.changes.iter().find(|c| c.key == "HardwareConfig").expect("config change");
    let old = change.old.clone().expect("old guid");
    let new = change.new.clone().expect("new guid");
    assert_eq!(old, "{7d2e1a44-1c3b-4f0e-8d2a-5b6c7d8e9f01}");
    assert!(new.starts_with('{') && new.ends_with('}'));
    assert!(ValueFormat::Guid.is_well_formed(&new));

    let new_key = paths::join(paths::HARDWARE_CONFIG, &new);
    assert_eq!(
        machine.read(&new_key, "BIOSVendor").expect("read"),
        Some(StoreValue::text("American Megatrends Inc."))
    );
    assert_eq!(machine.read(&new_key, "BootDriverFlags").expect("read"), Some(StoreValue::Dword(0)));
    assert!(machine.key_exists(&paths::join(&new_key, "ComputerIds")).expect("exists"));
    // The old subtree stays.
    assert!(machine.key_exists(&paths::join(paths::HARDWARE_CONFIG, &old)).expect("exists"));
    assert!(result.notes.iter().any(|n| n.starts_with("Copied 4 ")));

    // The BIOS mirror follows the target.
    for c in result.changes.iter().filter(|c| c.key == "BIOSVendor") {
        assert_eq!(
            machine.read(paths::BIOS, "BIOSVendor").expect("read").map(|v| v.to_display_string()),
            c.new
        );
        assert_eq!(c.applied, 2);
    }
}

/// The inventory-only BIOS serial is never part of a firmware spoof.
#[test]
fn firmware_read_only_serial_is_never_written() {
    let machine = sample_machine();
    let result = catalog()
        .spoof(IdentifierClass::Firmware, &machine.sources(), &mut rng(2))
        .expect("spoof firmware");
    assert!(result.changes.iter().all(|c| c.key != "BIOSSerial"));
    assert_eq!(result.changes.len(), 11);
}

/// Values that only get spoofed when present are skipped, with a note, when absent.
#[test]
fn missing_optional_values_are_skipped_with_a_note() {
    let mut fixture = MachineFixture::sample();
    fixture.store.get_mut(paths::HARDWARE_CONFIG).expect("config").remove("LastConfig");
    fixture
        .store
        .get_mut(paths::WINDOWS_NT_CURRENT_VERSION)
        .expect("nt")
        .remove("DigitalProductId4");
    let machine = MemoryMachine::from_fixture(fixture);
    let catalog = catalog();

    let firmware = catalog
        .spoof(IdentifierClass::Firmware, &machine.sources(), &mut rng(4))
        .expect("spoof firmware");
    assert!(firmware.changes.iter().all(|c| c.key != "HardwareConfig"));
    assert!(firmware.notes.iter().any(|n| n.contains("Hardware Config: not present")));
    assert_eq!(machine.read(paths::HARDWARE_CONFIG, "LastConfig").expect("read"), None);

    let product = catalog
        .spoof(IdentifierClass::ProductId, &machine.sources(), &mut rng(4))
        .expect("spoof product");
    let keys: Vec<&str> = product.changes.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["ProductId", "BuildGUID", "InstallDate", "DigitalProductId"]);
}

/// Product id, install date and digital product id keep their format and type.
#[test]
fn product_values_keep_their_shape() {
    let machine = sample_machine();
    let result = catalog()
        .spoof(IdentifierClass::ProductId, &machine.sources(), &mut rng(8))
        .expect("spoof product");
    let new_of = |key: &str| {
        result.changes.iter().find(|c| c.key == key).and_then(|c| c.new.clone()).expect(key)
    };

    let product_id = new_of("ProductId");
    let groups: Vec<&str> = product_id.split('-').collect();
    assert_eq!(groups.len(), 4);
    assert!(groups.iter().all(|g| g.len() == 5 && g.chars().all(|c| c.is_ascii_digit())));

    let nt = paths::WINDOWS_NT_CURRENT_VERSION;
    match machine.read(nt, "InstallDate").expect("read") {
        Some(StoreValue::Dword(ts)) => assert_ne!(ts, 1_650_000_000),
        other => panic!("install date should stay a number: {other:?}"),
    }
    match machine.read(nt, "DigitalProductId").expect("read") {
        Some(StoreValue::Binary(bytes)) => {
            assert_eq!(bytes.len(), 32);
            assert_eq!(&bytes[..4], &[0xA4, 0x00, 0x00, 0x00]);
        }
        other => panic!("digital product id should stay binary: {other:?}"),
    }
}

/// Disk serials keep the original length and alphabet; inquiry data keeps its header.
#[test]
fn storage_serials_follow_the_original_shape() {
    let machine = sample_machine();
    let result = catalog()
        .spoof(IdentifierClass::StorageSerial, &machine.sources(), &mut rng(9))
        .expect("spoof storage");
    assert!(result.changes.iter().all(|c| !c.key.starts_with("Win32_DiskDrive")));

    let hex_serial = result
        .changes
        .iter()
        .find(|c| c.key.starts_with(r"Scsi Port 1") && c.key.ends_with("SerialNumber"))
        .and_then(|c| c.new.clone())
        .expect("port 1 serial");
    assert_eq!(hex_serial.len(), 20);
    assert!(hex_serial.chars().all(|c| c.is_ascii_hexdigit()));

    let serial = result
        .changes
        .iter()
        .find(|c| c.key.starts_with(r"Scsi Port 0") && c.key.ends_with("SerialNumber"))
        .and_then(|c| c.new.clone())
        .expect("port 0 serial");
    assert_eq!(serial.len(), "S4EWNX0R123456K".len());

    let inquiry = result
        .changes
        .iter()
        .find(|c| c.key.ends_with("InquiryData"))
        .and_then(|c| c.new.clone())
        .expect("inquiry data");
    assert_eq!(inquiry.len(), 12);
    assert!(inquiry.starts_with("00000502"));
}

/// IDE and SCSI enumeration id lists are shown with storage but stay untouched by a spoof.
#[test]
fn enumerated_disk_ids_are_listed_but_never_written() {
    let machine = sample_machine();
    let catalog = catalog();
    let current = catalog
        .get_current(IdentifierClass::StorageSerial, &machine.sources())
        .expect("storage");
    let ids: Vec<(&str, &str)> = current
        .iter()
        .filter(|v| v.key.starts_with(r"IDE\") || v.key.starts_with(r"SCSI\"))
        .map(|v| (v.label.as_str(), v.value.as_deref().unwrap_or_default()))
        .collect();
    assert_eq!(
        ids,
        vec![
            (
                "WDC WD10EZEX-08WN4A0 HardwareID",
                r"IDE\DiskWDC_WD10EZEX-08WN4A0_______________01.01A01; GenDisk",
            ),
            (
                "Samsung SSD 970 EVO Plus 1TB HardwareID",
                r"SCSI\DiskNVMe____Samsung_SSD_970_EVO_Plus_1TB; SCSI\DiskNVMe____; GenDisk",
            ),
            ("Samsung SSD 970 EVO Plus 1TB CompatibleIDs", r"SCSI\Disk; SCSI\RAW"),
        ]
    );
    // The DVD drive has no id lists.
    assert!(current.iter().all(|v| !v.key.contains("CdRom")));

    let result = catalog
        .spoof(IdentifierClass::StorageSerial, &machine.sources(), &mut rng(10))
        .expect("spoof storage");
    assert!(result.changes.iter().all(|c| !c.key.ends_with("HardwareID")));
    assert!(result.changes.iter().all(|c| !c.key.ends_with("CompatibleIDs")));
    let nvme = format!(
        r"{}\SCSI\Disk&Ven_NVMe&Prod_Samsung_SSD_970\5&2d1a3b4c&0&000000",
        paths::DEVICE_ENUM
    );
    assert_eq!(
        machine.read(&nvme, "CompatibleIDs").expect("read"),
        Some(StoreValue::MultiText(vec![r"SCSI\Disk".to_string(), r"SCSI\RAW".to_string()]))
    );
}

/// Build lab and edition are displayed with the product ids and never rewritten.
#[test]
fn build_details_are_shown_with_product_ids() {
    let machine = sample_machine();
    let catalog = catalog();
    assert_eq!(
        current_of(&machine, IdentifierClass::ProductId, "BuildLab").as_deref(),
        Some("19041.vb_release.191206-1406")
    );
    assert_eq!(
        current_of(&machine, IdentifierClass::ProductId, "EditionID").as_deref(),
        Some("Professional")
    );

    let result = catalog
        .spoof(IdentifierClass::ProductId, &machine.sources(), &mut rng(11))
        .expect("spoof product");
    assert!(result.changes.iter().all(|c| !c.key.starts_with("BuildLab")));
    assert!(result.changes.iter().all(|c| c.key != "EditionID"));
    assert_eq!(
        current_of(&machine, IdentifierClass::ProductId, "BuildLabEx").as_deref(),
        Some("19041.1.amd64fre.vb_release.191206-1406")
    );
}

/// Two spoof_all runs produce values of the same shape but different content.
#[test]
fn successive_runs_keep_shape_but_change_content() {
    let machine = sample_machine();
    let catalog = catalog();
    let mut rng = rng(42);

    let first = catalog.spoof_all(&machine.sources(), &mut rng, None);
    let snapshot_a: Vec<_> = IdentifierClass::ALL
        .iter()
        .flat_map(|c| catalog.get_current(*c, &machine.sources()).expect("current"))
        .collect();
    let second = catalog.spoof_all(&machine.sources(), &mut rng, None);
    let snapshot_b: Vec<_> = IdentifierClass::ALL
        .iter()
        .flat_map(|c| catalog.get_current(*c, &machine.sources()).expect("current"))
        .collect();

    assert!(first.iter().chain(&second).all(|o| o.result.is_ok()));
    assert_eq!(snapshot_a.len(), snapshot_b.len());

    let writable: Vec<(String, ValueFormat)> = IdentifierClass::ALL
        .iter()
        .flat_map(|c| catalog.fields(*c, &machine.sources()).expect("fields"))
        .filter(|f| f.is_writable())
        .map(|f| (f.key, f.format))
        .collect();
    for (key, format) in writable {
        let a = snapshot_a.iter().find(|v| v.key == key).and_then(|v| v.value.clone());
        let b = snapshot_b.iter().find(|v| v.key == key).and_then(|v| v.value.clone());
        let (Some(a), Some(b)) = (a, b) else {
            panic!("{key} should have a value after both runs");
        };
        assert!(format.is_well_formed(&a), "{key}: {a}");
        assert!(format.is_well_formed(&b), "{key}: {b}");
        assert!(!format.same_value(&a, &b), "{key} did not change: {a}");
    }
}

/// The same seed generates the same values.
#[test]
fn same_seed_gives_same_values() {
    let a = sample_machine();
    let b = sample_machine();
    let catalog = catalog();
    catalog.spoof(IdentifierClass::MachineGuid, &a.sources(), &mut rng(99)).expect("spoof a");
    catalog.spoof(IdentifierClass::MachineGuid, &b.sources(), &mut rng(99)).expect("spoof b");
    assert_eq!(
        current_of(&a, IdentifierClass::MachineGuid, "MachineGuid"),
        current_of(&b, IdentifierClass::MachineGuid, "MachineGuid")
    );
}
