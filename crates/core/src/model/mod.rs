//! Core data model: identifier classes, backing locations, and the values they hold.
//!
//! A logical identifier (a [`Field`]) lives in one or more [`BackingLocation`]s.
//! Each location is either written by the engine (targets and mirrors) or only
//! observed (observers and fallbacks). Classes group fields that are spoofed and
//! verified together.

use std::fmt;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Category of machine-identity value.
///
/// The declaration order is the order in which `spoof_all`, backups and
/// verification visit the classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierClass {
    MachineGuid,
    ComputerName,
    Firmware,
    NetworkAddress,
    StorageSerial,
    ProductId,
}

impl IdentifierClass {
    /// Every class, in the fixed processing order.
    pub const ALL: [IdentifierClass; 6] = [
        IdentifierClass::MachineGuid,
        IdentifierClass::ComputerName,
        IdentifierClass::Firmware,
        IdentifierClass::NetworkAddress,
        IdentifierClass::StorageSerial,
        IdentifierClass::ProductId,
    ];

    /// Stable machine-readable name, used in snapshot keys and on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            IdentifierClass::MachineGuid => "machine-guid",
            IdentifierClass::ComputerName => "computer-name",
            IdentifierClass::Firmware => "firmware",
            IdentifierClass::NetworkAddress => "network",
            IdentifierClass::StorageSerial => "storage",
            IdentifierClass::ProductId => "product",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            IdentifierClass::MachineGuid => "Machine GUID",
            IdentifierClass::ComputerName => "Computer Name",
            IdentifierClass::Firmware => "BIOS / SMBIOS",
            IdentifierClass::NetworkAddress => "MAC Addresses",
            IdentifierClass::StorageSerial => "Disk Identifiers",
            IdentifierClass::ProductId => "Windows Product IDs",
        }
    }

    /// Parse a slug back into a class.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.slug().eq_ignore_ascii_case(slug))
    }

    /// Whether a snapshot value of this class can be written back by restore.
    pub fn restorable(self) -> bool {
        matches!(self, IdentifierClass::MachineGuid | IdentifierClass::ComputerName)
    }
}

impl fmt::Display for IdentifierClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A raw value as held by a backing location.
///
/// Serialized untagged so simulation fixtures can use plain JSON: a string is
/// text, an array of strings is multi-text, a number is a 32-bit integer and an
/// array of numbers is a binary blob. An empty array reads back as an empty blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Text(String),
    Dword(u32),
    Binary(Vec<u8>),
    MultiText(Vec<String>),
}

impl StoreValue {
    pub fn text(value: impl Into<String>) -> Self {
        StoreValue::Text(value.into())
    }

    /// Borrow the value as text, if it is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoreValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Plain string form: multi-text joined with `; `, binary as uppercase hex.
    pub fn to_display_string(&self) -> String {
        match self {
            StoreValue::Text(s) => s.clone(),
            StoreValue::MultiText(items) => items.join("; "),
            StoreValue::Dword(n) => n.to_string(),
            StoreValue::Binary(bytes) => to_hex(bytes),
        }
    }
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Which OS data source a location belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    ConfigStore,
    InventoryQuery,
    LiveState,
}

/// Whether the engine may write a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Part a location plays for its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationRole {
    /// Authoritative writable value.
    Target,
    /// Writable copy that receives the same value as the target.
    Mirror,
    /// Read-only view expected to converge with the target after a restart or reboot.
    Observer,
    /// Read-only value shown when the target is absent; never compared.
    Fallback,
}

/// Live OS values the engine knows how to address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiveProperty {
    Hostname,
    InterfaceAddress { description: String },
}

/// Where exactly a location's value lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locator {
    Store { path: String, name: String },
    Inventory { class: String, property: String, index: usize },
    Live(LiveProperty),
}

impl Locator {
    pub fn store(path: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Store { path: path.into(), name: name.into() }
    }

    pub fn inventory(class: impl Into<String>, property: impl Into<String>) -> Self {
        Locator::Inventory { class: class.into(), property: property.into(), index: 0 }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Locator::Store { .. } => SourceKind::ConfigStore,
            Locator::Inventory { .. } => SourceKind::InventoryQuery,
            Locator::Live(_) => SourceKind::LiveState,
        }
    }

    /// Inventory results and live interface addresses can never be written.
    fn supports_write(&self) -> bool {
        matches!(self, Locator::Store { .. } | Locator::Live(LiveProperty::Hostname))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Store { path, name } => write!(f, "{path}\\{name}"),
            Locator::Inventory { class, property, index: 0 } => write!(f, "{class}.{property}"),
            Locator::Inventory { class, property, index } => {
                write!(f, "{class}[{index}].{property}")
            }
            Locator::Live(LiveProperty::Hostname) => f.write_str("live hostname"),
            Locator::Live(LiveProperty::InterfaceAddress { description }) => {
                write!(f, "live address of '{description}'")
            }
        }
    }
}

/// One concrete place an identifier's value is stored or reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackingLocation {
    pub locator: Locator,
    pub role: LocationRole,
    /// Write failures are expected and not reported (e.g. volatile hives, live API calls).
    pub best_effort: bool,
}

impl BackingLocation {
    pub fn new(locator: Locator, role: LocationRole) -> Self {
        Self { locator, role, best_effort: false }
    }

    pub fn target(locator: Locator) -> Self {
        Self::new(locator, LocationRole::Target)
    }

    pub fn mirror(locator: Locator) -> Self {
        Self::new(locator, LocationRole::Mirror)
    }

    pub fn observer(locator: Locator) -> Self {
        Self::new(locator, LocationRole::Observer)
    }

    pub fn fallback(locator: Locator) -> Self {
        Self::new(locator, LocationRole::Fallback)
    }

    /// Builder-style helper marking the location as best-effort.
    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn kind(&self) -> SourceKind {
        self.locator.kind()
    }

    pub fn access(&self) -> Access {
        let writable_role = matches!(self.role, LocationRole::Target | LocationRole::Mirror);
        if writable_role && self.locator.supports_write() {
            Access::ReadWrite
        } else {
            Access::ReadOnly
        }
    }

    pub fn is_writable(&self) -> bool {
        self.access() == Access::ReadWrite
    }
}

/// Lexical shape of a field's value; selects both the generator and the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueFormat {
    /// Canonical GUID; braces are kept when the original value had them.
    Guid,
    /// GUID that is always wrapped in braces.
    BracedGuid,
    MacAddress,
    Serial { len: usize },
    /// Serial matching the original's length (capped) and alphabet.
    SerialLike { max_len: usize },
    Hex { len: usize },
    HostName,
    ProductId,
    BiosDate,
    Manufacturer,
    BiosVendor,
    SystemProduct,
    SystemVersion,
    BiosVersion,
    BoardProduct,
    BoardVersion,
    /// 32-bit seconds since the Unix epoch.
    InstallDate,
    /// Binary blob whose 4-byte length header must survive.
    HeaderBlob,
    /// Read-only value that is displayed and compared but never generated.
    Opaque,
}

impl ValueFormat {
    /// Render a raw value the way it is displayed, backed up and compared.
    pub fn render(&self, value: &StoreValue) -> String {
        match (self, value) {
            (ValueFormat::InstallDate, StoreValue::Dword(ts)) => {
                match DateTime::from_timestamp(i64::from(*ts), 0) {
                    Some(dt) => format!("{ts} ({})", dt.format("%Y-%m-%d %H:%M:%S")),
                    None => ts.to_string(),
                }
            }
            _ => value.to_display_string(),
        }
    }

    /// Canonical comparison form: trimmed and uppercased; addresses lose their
    /// separators and dates keep only the leading timestamp.
    pub fn normalize(&self, value: &str) -> String {
        let trimmed = value.trim();
        match self {
            ValueFormat::MacAddress => trimmed
                .chars()
                .filter(|c| !matches!(c, '-' | ':' | '.'))
                .collect::<String>()
                .to_ascii_uppercase(),
            ValueFormat::InstallDate => {
                trimmed.split_whitespace().next().unwrap_or_default().to_string()
            }
            _ => trimmed.to_uppercase(),
        }
    }

    /// Case-insensitive equality in this format's canonical form.
    pub fn same_value(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }

    /// Whether a rendered value has the shape consumers of this field expect.
    pub fn is_well_formed(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            ValueFormat::Guid => parse_guid(value.trim_start_matches('{').trim_end_matches('}')),
            ValueFormat::BracedGuid => {
                value.starts_with('{')
                    && value.ends_with('}')
                    && parse_guid(&value[1..value.len() - 1])
            }
            ValueFormat::MacAddress => {
                let normalized = self.normalize(value);
                normalized.len() == 12 && normalized.chars().all(|c| c.is_ascii_hexdigit())
            }
            ValueFormat::Serial { .. } | ValueFormat::SerialLike { .. } => {
                !value.is_empty()
                    && value.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
            }
            ValueFormat::Hex { len } => {
                value.len() == (*len).max(1) && value.chars().all(|c| c.is_ascii_hexdigit())
            }
            ValueFormat::HostName => {
                !value.is_empty()
                    && value.len() <= 63
                    && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                    && !value.starts_with('-')
            }
            ValueFormat::ProductId => {
                let groups: Vec<&str> = value.split('-').collect();
                groups.len() == 4
                    && groups
                        .iter()
                        .all(|g| g.len() == 5 && g.chars().all(|c| c.is_ascii_alphanumeric()))
            }
            ValueFormat::BiosDate => chrono::NaiveDate::parse_from_str(value, "%m/%d/%Y").is_ok(),
            ValueFormat::InstallDate => self.normalize(value).parse::<u32>().is_ok(),
            ValueFormat::HeaderBlob => {
                !value.is_empty()
                    && value.len() % 2 == 0
                    && value.chars().all(|c| c.is_ascii_hexdigit())
            }
            ValueFormat::Manufacturer
            | ValueFormat::BiosVendor
            | ValueFormat::SystemProduct
            | ValueFormat::SystemVersion
            | ValueFormat::BiosVersion
            | ValueFormat::BoardProduct
            | ValueFormat::BoardVersion
            | ValueFormat::Opaque => !value.is_empty(),
        }
    }
}

fn parse_guid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::parse_str(value).is_ok()
}

/// A logical identifier and the ordered locations that hold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Discriminator, unique within the class (second half of the snapshot key).
    pub key: String,
    pub label: String,
    pub format: ValueFormat,
    pub locations: Vec<BackingLocation>,
    /// Skip the write when no current value exists.
    #[serde(default)]
    pub require_existing: bool,
}

impl Field {
    pub fn new(key: impl Into<String>, label: impl Into<String>, format: ValueFormat) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            format,
            locations: Vec::new(),
            require_existing: false,
        }
    }

    /// Builder-style helper appending a location.
    pub fn at(mut self, location: BackingLocation) -> Self {
        self.locations.push(location);
        self
    }

    /// Builder-style helper setting `require_existing`.
    pub fn only_when_present(mut self) -> Self {
        self.require_existing = true;
        self
    }

    /// True when at least one location can be written.
    pub fn is_writable(&self) -> bool {
        self.locations.iter().any(BackingLocation::is_writable)
    }
}

/// The value found at one location during a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub location: BackingLocation,
    pub value: Option<StoreValue>,
}

/// A field together with what each of its locations currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReading {
    pub field: Field,
    pub observations: Vec<Observation>,
}

impl FieldReading {
    fn first_with(&self, role: LocationRole, kind: Option<SourceKind>) -> Option<&StoreValue> {
        self.observations
            .iter()
            .filter(|o| o.location.role == role)
            .filter(|o| kind.map_or(true, |k| o.location.kind() == k))
            .find_map(|o| o.value.as_ref())
    }

    /// Value of the first target location that holds one.
    pub fn target_value(&self) -> Option<&StoreValue> {
        self.first_with(LocationRole::Target, None)
    }

    /// Effective current value: target, then fallback, then a config-store
    /// mirror, then whatever an observer reports.
    pub fn current(&self) -> Option<&StoreValue> {
        self.target_value()
            .or_else(|| self.first_with(LocationRole::Fallback, None))
            .or_else(|| self.first_with(LocationRole::Mirror, Some(SourceKind::ConfigStore)))
            .or_else(|| self.first_with(LocationRole::Observer, None))
    }

    /// Rendered effective current value.
    pub fn current_display(&self) -> Option<String> {
        self.current().map(|v| self.field.format.render(v))
    }
}

/// One label/value pair returned by `Catalog::get_current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentValue {
    pub key: String,
    pub label: String,
    pub value: Option<String>,
}
