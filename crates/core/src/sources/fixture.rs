//! Serializable description of a simulated machine.
//!
//! A fixture is what the in-memory backend loads from and saves back to, so a
//! simulated machine survives across CLI invocations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{InventoryRecord, LiveInterface};
use crate::adapters::paths;
use crate::model::StoreValue;

fn default_true() -> bool {
    true
}

/// Complete state of a simulated machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineFixture {
    /// Store key path to its values. Keys without values are listed with an empty map.
    #[serde(default)]
    pub store: BTreeMap<String, BTreeMap<String, StoreValue>>,
    /// Inventory class to its records.
    #[serde(default)]
    pub inventory: BTreeMap<String, Vec<InventoryRecord>>,
    #[serde(default)]
    pub hostname: String,
    /// Name set through the live API that takes effect on the next reboot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_hostname: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<LiveInterface>,
    #[serde(default = "default_true")]
    pub elevated: bool,
    /// Store paths (and everything below them) that reject writes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_only_paths: Vec<String>,
    /// Make the live set-hostname call fail.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fail_set_hostname: bool,
}

impl MachineFixture {
    fn set(&mut self, path: &str, name: &str, value: StoreValue) {
        self.store.entry(path.to_string()).or_default().insert(name.to_string(), value);
    }

    fn set_text(&mut self, path: &str, name: &str, value: &str) {
        self.set(path, name, StoreValue::text(value));
    }

    fn set_multi(&mut self, path: &str, name: &str, values: &[&str]) {
        let items = values.iter().map(|v| v.to_string()).collect();
        self.set(path, name, StoreValue::MultiText(items));
    }

    fn touch(&mut self, path: &str) {
        self.store.entry(path.to_string()).or_default();
    }

    fn record(&mut self, class: &str, pairs: &[(&str, &str)]) {
        let record: InventoryRecord =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.inventory.entry(class.to_string()).or_default().push(record);
    }

    /// A desktop with two physical NICs, two virtual ones, two disks and a DVD drive.
    pub fn sample() -> Self {
        let mut f = MachineFixture { elevated: true, ..Default::default() };
        let host = "DESKTOP-ORIG001";

        f.set_text(paths::CRYPTOGRAPHY, "MachineGuid", "3f2504e0-4f89-41d3-9a0c-0305e82c3301");

        f.set_text(paths::COMPUTER_NAME_PENDING, "ComputerName", host);
        f.set_text(paths::COMPUTER_NAME_ACTIVE, "ComputerName", host);
        f.set_text(paths::TCPIP_PARAMETERS, "Hostname", host);
        f.set_text(paths::TCPIP_PARAMETERS, "NV Hostname", host);
        f.set_text(paths::TCPIP_PARAMETERS, "Domain", "");

        let firmware = [
            ("SystemManufacturer", "ASUS"),
            ("SystemProductName", "System Product Name"),
            ("SystemVersion", "System Version"),
            ("BIOSVendor", "American Megatrends Inc."),
            ("BIOSVersion", "1402"),
            ("BIOSReleaseDate", "04/11/2022"),
            ("BaseBoardManufacturer", "ASUSTeK COMPUTER INC."),
            ("BaseBoardProduct", "PRIME B560M-A"),
            ("BaseBoardVersion", "Rev 1.xx"),
        ];
        for (name, value) in firmware {
            f.set_text(paths::SYSTEM_INFORMATION, name, value);
            f.set_text(paths::BIOS, name, value);
        }
        f.set_text(
            paths::SYSTEM_INFORMATION,
            "ComputerHardwareId",
            "{8c1d2e3f-4a5b-4c6d-8e7f-9a0b1c2d3e4f}",
        );

        let config_guid = "{7d2e1a44-1c3b-4f0e-8d2a-5b6c7d8e9f01}";
        f.set_text(paths::HARDWARE_CONFIG, "LastConfig", config_guid);
        let config_key = paths::join(paths::HARDWARE_CONFIG, config_guid);
        f.set_text(&config_key, "BIOSVendor", "American Megatrends Inc.");
        f.set_text(&config_key, "BaseBoardProduct", "PRIME B560M-A");
        f.set(&config_key, "BootDriverFlags", StoreValue::Dword(0));
        f.set(
            &paths::join(&config_key, "ComputerIds"),
            "{a1b2c3d4-0000-4000-8000-000000000001}",
            StoreValue::text("Manufacturer + Family + ProductName"),
        );

        f.touch(&paths::join(paths::ADAPTER_CLASS, "Properties"));
        let adapters: [(&str, &str, &str, Option<&str>); 4] = [
            ("0000", "WAN Miniport (IP)", "ms_ndiswanip", None),
            ("0001", "Intel(R) Ethernet Connection I219-V", r"pci\ven_8086&dev_15bc", None),
            ("0002", "VirtualBox Host-Only Ethernet Adapter", "sun_vboxnetadp", None),
            ("0003", "Realtek PCIe GbE Family Controller", r"pci\ven_10ec&dev_8168", Some("00E04C680001")),
        ];
        for (subkey, desc, component, address) in adapters {
            let key = paths::join(paths::ADAPTER_CLASS, subkey);
            f.set_text(&key, "DriverDesc", desc);
            f.set_text(&key, "ComponentId", component);
            if let Some(address) = address {
                f.set_text(&key, "NetworkAddress", address);
            }
        }
        f.set_text(
            &paths::join(paths::ADAPTER_CLASS, "0001"),
            "OriginalNetworkAddress",
            "3C7C3F1A2B4C",
        );
        let tap = paths::join(paths::ADAPTER_CLASS, "0004");
        f.set_text(&tap, "DriverDesc", "TAP-Windows Adapter V9");
        f.set_text(&tap, "ComponentId", "tap0901");

        let port0 = paths::join(paths::SCSI_DEVICE_MAP, "Scsi Port 0");
        f.set_text(&port0, "Driver", "stornvme");
        let lun0 = paths::join(&port0, r"Scsi Bus 0\Target Id 0\Logical Unit Id 0");
        f.set_text(&lun0, "Identifier", "Samsung SSD 970 EVO Plus 1TB");
        f.set_text(&lun0, "SerialNumber", "S4EWNX0R123456K");
        f.set_text(&lun0, "Type", "DiskPeripheral");
        let lun1 = paths::join(
            paths::SCSI_DEVICE_MAP,
            r"Scsi Port 1\Scsi Bus 0\Target Id 0\Logical Unit Id 0",
        );
        f.set_text(&lun1, "Identifier", "WDC WD10EZEX-08WN4A0");
        f.set_text(&lun1, "SerialNumber", "57442D574343334630313233");
        f.set(&lun1, "InquiryData", StoreValue::Binary(vec![0x00, 0x00, 0x05, 0x02, 0x5B, 0x00]));

        let nvme = paths::join(
            paths::DEVICE_ENUM,
            r"SCSI\Disk&Ven_NVMe&Prod_Samsung_SSD_970\5&2d1a3b4c&0&000000",
        );
        f.set_text(&nvme, "FriendlyName", "Samsung SSD 970 EVO Plus 1TB");
        f.set_multi(
            &nvme,
            "HardwareID",
            &[r"SCSI\DiskNVMe____Samsung_SSD_970_EVO_Plus_1TB", r"SCSI\DiskNVMe____", "GenDisk"],
        );
        f.set_multi(&nvme, "CompatibleIDs", &[r"SCSI\Disk", r"SCSI\RAW"]);
        let sata = paths::join(
            paths::DEVICE_ENUM,
            r"IDE\DiskWDC_WD10EZEX-08WN4A0_______________01.01A01\5&1a2b3c4d&0&0.0.0",
        );
        f.set_text(&sata, "FriendlyName", "WDC WD10EZEX-08WN4A0");
        f.set_multi(
            &sata,
            "HardwareID",
            &[r"IDE\DiskWDC_WD10EZEX-08WN4A0_______________01.01A01", "GenDisk"],
        );
        // An instance with no id lists contributes nothing.
        let cdrom = paths::join(paths::DEVICE_ENUM, r"SCSI\CdRom&Ven_HL-DT-ST\5&9f8e7d6c&0&010000");
        f.set_text(&cdrom, "FriendlyName", "HL-DT-ST DVDRAM GH24NSD1");

        let nt = paths::WINDOWS_NT_CURRENT_VERSION;
        f.set_text(nt, "ProductId", "00330-80000-00000-AA123");
        f.set_text(nt, "BuildGUID", "ffffffff-ffff-ffff-ffff-ffffffffffff");
        f.set(nt, "InstallDate", StoreValue::Dword(1_650_000_000));
        let mut digital = vec![0xA4, 0x00, 0x00, 0x00, 0x03, 0x00];
        digital.extend(std::iter::repeat(0x5A).take(26));
        f.set(nt, "DigitalProductId", StoreValue::Binary(digital));
        let mut digital4 = vec![0xF8, 0x04, 0x00, 0x00, 0x04, 0x00];
        digital4.extend(std::iter::repeat(0x33).take(26));
        f.set(nt, "DigitalProductId4", StoreValue::Binary(digital4));
        f.set_text(nt, "BuildLab", "19041.vb_release.191206-1406");
        f.set_text(nt, "BuildLabEx", "19041.1.amd64fre.vb_release.191206-1406");
        f.set_text(nt, "EditionID", "Professional");
        f.set_text(nt, "CurrentBuild", "19045");

        f.record(
            "Win32_BIOS",
            &[
                ("Manufacturer", "American Megatrends Inc."),
                ("SerialNumber", "System Serial Number"),
                ("SMBIOSBIOSVersion", "1402"),
            ],
        );
        f.record(
            "Win32_BaseBoard",
            &[
                ("Manufacturer", "ASUSTeK COMPUTER INC."),
                ("Product", "PRIME B560M-A"),
                ("SerialNumber", "210685721400123"),
            ],
        );
        f.record(
            "Win32_ComputerSystem",
            &[("Manufacturer", "ASUS"), ("Model", "System Product Name"), ("Name", host)],
        );
        f.record(
            "Win32_ComputerSystemProduct",
            &[("UUID", "03000200-0400-0500-0006-000700080009"), ("Vendor", "ASUS")],
        );
        f.record(
            "Win32_DiskDrive",
            &[("Model", "Samsung SSD 970 EVO Plus 1TB"), ("SerialNumber", "0025_3881_91B2_C3D4.")],
        );
        f.record(
            "Win32_DiskDrive",
            &[("Model", "WDC WD10EZEX-08WN4A0"), ("SerialNumber", "WD-WCC3F0123")],
        );
        f.record(
            "Win32_OperatingSystem",
            &[("Caption", "Microsoft Windows 10 Pro"), ("SerialNumber", "00330-80000-00000-AA123")],
        );
        f.record(
            "Win32_Processor",
            &[("Name", "Intel(R) Core(TM) i5-11400 CPU @ 2.60GHz"), ("ProcessorId", "BFEBFBFF000A0671")],
        );
        f.record(
            "Win32_NetworkAdapterConfiguration",
            &[("Description", "Intel(R) Ethernet Connection I219-V"), ("MACAddress", "3C:7C:3F:1A:2B:4C")],
        );

        f.hostname = host.to_string();
        f.interfaces = vec![
            interface("Ethernet", "Intel(R) Ethernet Connection I219-V", Some("3C7C3F1A2B4C"), "Up"),
            interface("Ethernet 2", "Realtek PCIe GbE Family Controller", Some("00E04C680001"), "Up"),
            interface(
                "VirtualBox Host-Only Network",
                "VirtualBox Host-Only Ethernet Adapter",
                Some("0A0027000011"),
                "Up",
            ),
            interface("Local Area Connection", "TAP-Windows Adapter V9", Some("00FF11223344"), "Disconnected"),
        ];
        f
    }
}

fn interface(name: &str, description: &str, address: Option<&str>, status: &str) -> LiveInterface {
    LiveInterface {
        name: name.to_string(),
        description: description.to_string(),
        address: address.map(str::to_string),
        status: status.to_string(),
    }
}
