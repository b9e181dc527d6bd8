//! Configuration-store paths, relative to the local-machine hive.

pub const CRYPTOGRAPHY: &str = r"SOFTWARE\Microsoft\Cryptography";
pub const COMPUTER_NAME_PENDING: &str =
    r"SYSTEM\CurrentControlSet\Control\ComputerName\ComputerName";
pub const COMPUTER_NAME_ACTIVE: &str =
    r"SYSTEM\CurrentControlSet\Control\ComputerName\ActiveComputerName";
pub const TCPIP_PARAMETERS: &str = r"SYSTEM\CurrentControlSet\Services\Tcpip\Parameters";
pub const SYSTEM_INFORMATION: &str = r"SYSTEM\CurrentControlSet\Control\SystemInformation";
pub const BIOS: &str = r"HARDWARE\DESCRIPTION\System\BIOS";
pub const HARDWARE_CONFIG: &str = r"SYSTEM\HardwareConfig";
pub const ADAPTER_CLASS: &str =
    r"SYSTEM\CurrentControlSet\Control\Class\{4d36e972-e325-11ce-bfc1-08002be10318}";
pub const SCSI_DEVICE_MAP: &str = r"HARDWARE\DEVICEMAP\Scsi";
pub const DEVICE_ENUM: &str = r"SYSTEM\CurrentControlSet\Enum";
pub const WINDOWS_NT_CURRENT_VERSION: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";

/// Join store path segments with `\`.
pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}\\{child}")
    }
}
