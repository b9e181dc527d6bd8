//! Read-only diagnostic dump of everything the engine can see.
//!
//! Nothing here writes to any source. The report is plain data; `render_text`
//! and `write_to` produce the timestamped log file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::adapters::network::is_virtual_adapter;
use crate::adapters::{paths, walk_subtree};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::Privilege;
use crate::model::{LocationRole, ValueFormat};
use crate::sources::Sources;

/// Inventory classes included in the dump.
pub const INVENTORY_CLASSES: &[&str] = &[
    "Win32_BIOS",
    "Win32_BaseBoard",
    "Win32_ComputerSystem",
    "Win32_ComputerSystemProduct",
    "Win32_DiskDrive",
    "Win32_NetworkAdapterConfiguration",
    "Win32_OperatingSystem",
    "Win32_Processor",
];

const PRODUCT_EXTRAS: &[&str] = &["BuildLab", "BuildLabEx", "EditionID", "CurrentBuild"];
const NOT_SET: &str = "(not set)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    pub label: String,
    pub value: String,
    pub level: DiagnosticLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSection {
    pub title: String,
    pub items: Vec<DiagnosticItem>,
}

impl DiagnosticSection {
    fn new(title: &str) -> Self {
        Self { title: title.to_string(), items: Vec::new() }
    }

    fn push(&mut self, label: impl Into<String>, value: impl Into<String>, level: DiagnosticLevel) {
        self.items.push(DiagnosticItem { label: label.into(), value: value.into(), level });
    }

    fn info(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.push(label, value, DiagnosticLevel::Info);
    }

    fn warn(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.push(label, value, DiagnosticLevel::Warning);
    }

    fn error(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.push(label, value, DiagnosticLevel::Error);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub generated_at: String,
    /// `YYYYMMDD_HHMMSS`, used in the log file name.
    pub stamp: String,
    pub sections: Vec<DiagnosticSection>,
}

impl DiagnosticReport {
    /// Collect a report stamped with the current local time.
    pub fn collect(
        catalog: &Catalog,
        sources: &Sources,
        config: &EngineConfig,
        privilege: Privilege,
    ) -> Self {
        Self::collect_at(catalog, sources, config, privilege, Local::now())
    }

    pub fn collect_at(
        catalog: &Catalog,
        sources: &Sources,
        config: &EngineConfig,
        privilege: Privilege,
        now: DateTime<Local>,
    ) -> Self {
        let sections = vec![
            environment(sources, privilege, &now),
            identifiers(catalog, sources),
            hardware_config(sources),
            product_extras(sources),
            store_adapters(sources, config),
            device_map(sources, config),
            inventory(sources),
            live_interfaces(sources),
            consistency(sources),
        ];
        Self {
            generated_at: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            stamp: now.format("%Y%m%d_%H%M%S").to_string(),
            sections,
        }
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.sections.iter().flat_map(|s| &s.items).filter(|i| i.level == level).count()
    }

    pub fn errors(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(DiagnosticLevel::Warning)
    }

    pub fn file_name(&self) -> String {
        format!("hwid_debug_{}.log", self.stamp)
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("HWID diagnostic report\nGenerated: {}\n", self.generated_at);
        for section in &self.sections {
            out.push_str(&format!("\n==== {} ====\n", section.title));
            if section.items.is_empty() {
                out.push_str("  (none)\n");
            }
            for item in &section.items {
                let marker = match item.level {
                    DiagnosticLevel::Info => "",
                    DiagnosticLevel::Warning => "[WARN] ",
                    DiagnosticLevel::Error => "[ERROR] ",
                };
                out.push_str(&format!("  {marker}{}: {}\n", item.label, item.value));
            }
        }
        out.push_str(&format!(
            "\n==== Summary ====\n  Errors: {}\n  Warnings: {}\n",
            self.errors(),
            self.warnings()
        ));
        out
    }

    /// Write the rendered report into `dir`, returning the file path.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.render_text())?;
        Ok(path)
    }
}

fn environment(sources: &Sources, privilege: Privilege, now: &DateTime<Local>) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Environment");
    section.info("Timestamp", now.to_rfc3339());
    section.info("Engine version", crate::version());
    section.info("Platform", format!("{} / {}", std::env::consts::OS, std::env::consts::ARCH));
    if privilege.is_elevated() {
        section.info("Elevated", "yes");
    } else {
        section.warn("Elevated", "no (spoof and restore are unavailable)");
    }
    match sources.live.hostname() {
        Ok(name) => section.info("Live hostname", name),
        Err(err) => section.error("Live hostname", err.to_string()),
    }
    section
}

fn identifiers(catalog: &Catalog, sources: &Sources) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Identifier Locations");
    for class in catalog.list_classes() {
        match catalog.read(class, sources) {
            Ok(readings) => {
                for reading in readings {
                    for obs in &reading.observations {
                        let label = format!(
                            "[{}] {} @ {} ({:?})",
                            class.slug(),
                            reading.field.label,
                            obs.location.locator,
                            obs.location.role
                        );
                        let value = obs
                            .value
                            .as_ref()
                            .map(|v| reading.field.format.render(v))
                            .unwrap_or_else(|| NOT_SET.to_string());
                        if obs.value.is_none() && obs.location.role == LocationRole::Target {
                            section.warn(label, value);
                        } else {
                            section.info(label, value);
                        }
                    }
                }
            }
            Err(err) => section.error(class.label(), err.to_string()),
        }
    }
    section
}

fn hardware_config(sources: &Sources) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Hardware Config");
    let last = sources
        .store
        .read(paths::HARDWARE_CONFIG, "LastConfig")
        .ok()
        .flatten()
        .map(|v| v.to_display_string());
    section.info("LastConfig", last.clone().unwrap_or_else(|| NOT_SET.to_string()));
    match sources.store.subkeys(paths::HARDWARE_CONFIG) {
        Ok(subkeys) => {
            for subkey in subkeys {
                let current = last.as_deref().is_some_and(|l| l.eq_ignore_ascii_case(&subkey));
                section.info(subkey, if current { "current" } else { "previous" });
            }
        }
        Err(err) => section.error("Subkeys", err.to_string()),
    }
    section
}

fn product_extras(sources: &Sources) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Windows Build");
    for name in PRODUCT_EXTRAS {
        let value = sources
            .store
            .read(paths::WINDOWS_NT_CURRENT_VERSION, name)
            .ok()
            .flatten()
            .map(|v| v.to_display_string())
            .unwrap_or_else(|| NOT_SET.to_string());
        section.info(*name, value);
    }
    section
}

fn store_adapters(sources: &Sources, config: &EngineConfig) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Network Adapters (store)");
    let subkeys = match sources.store.subkeys(paths::ADAPTER_CLASS) {
        Ok(subkeys) => subkeys,
        Err(err) => {
            section.error("Adapter class", err.to_string());
            return section;
        }
    };
    for subkey in subkeys.iter().filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
    {
        let key = paths::join(paths::ADAPTER_CLASS, subkey);
        let text = |name: &str| {
            sources.store.read(&key, name).ok().flatten().map(|v| v.to_display_string())
        };
        let description = text("DriverDesc").unwrap_or_default();
        let component = text("ComponentId").unwrap_or_default();
        let excluded = is_virtual_adapter(&description, &component, &config.virtual_adapter_markers);
        let address = text("NetworkAddress").unwrap_or_else(|| NOT_SET.to_string());
        section.info(
            format!("{subkey} {description}"),
            format!(
                "component={component} address={address}{}",
                if excluded { " (virtual, excluded)" } else { "" }
            ),
        );
        if let Some(address) = text("NetworkAddress") {
            if !ValueFormat::MacAddress.is_well_formed(&address) {
                section.warn(format!("{subkey} NetworkAddress"), format!("malformed: {address}"));
            }
        }
    }
    section
}

fn device_map(sources: &Sources, config: &EngineConfig) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Storage Device Map");
    for node in walk_subtree(sources, paths::SCSI_DEVICE_MAP, config.subtree_depth) {
        let Ok(names) = sources.store.value_names(&node) else {
            continue;
        };
        for name in names {
            if let Ok(Some(value)) = sources.store.read(&node, &name) {
                section.info(format!("{node}\\{name}"), value.to_display_string());
            }
        }
    }
    section
}

fn inventory(sources: &Sources) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Inventory");
    for class in INVENTORY_CLASSES {
        match sources.inventory.query(class) {
            Ok(records) if records.is_empty() => section.warn(*class, "no records"),
            Ok(records) => {
                for (index, record) in records.iter().enumerate() {
                    for (property, value) in record {
                        section.info(format!("{class}[{index}].{property}"), value.clone());
                    }
                }
            }
            Err(err) => section.error(*class, err.to_string()),
        }
    }
    section
}

fn live_interfaces(sources: &Sources) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Live Interfaces");
    match sources.live.interfaces() {
        Ok(interfaces) => {
            for iface in interfaces {
                section.info(
                    format!("{} ({})", iface.name, iface.description),
                    format!(
                        "{} [{}]",
                        iface.address.unwrap_or_else(|| NOT_SET.to_string()),
                        iface.status
                    ),
                );
            }
        }
        Err(err) => section.error("Interfaces", err.to_string()),
    }
    section
}

fn consistency(sources: &Sources) -> DiagnosticSection {
    let mut section = DiagnosticSection::new("Consistency Checks");
    let read = |path: &str| {
        sources.store.read(path, "ComputerName").ok().flatten().map(|v| v.to_display_string())
    };
    let pending = read(paths::COMPUTER_NAME_PENDING);
    let active = read(paths::COMPUTER_NAME_ACTIVE);
    let live = sources.live.hostname().ok();

    match (&live, &active) {
        (Some(live), Some(active)) if live.eq_ignore_ascii_case(active) => {
            section.info("Live vs active name", "match")
        }
        (Some(live), Some(active)) => {
            section.warn("Live vs active name", format!("live={live} active={active}"))
        }
        _ => section.warn("Live vs active name", "could not compare"),
    }
    match (&active, &pending) {
        (Some(active), Some(pending)) if active.eq_ignore_ascii_case(pending) => {
            section.info("Active vs pending name", "match")
        }
        (Some(active), Some(pending)) => section.warn(
            "Active vs pending name",
            format!("active={active} pending={pending} (reboot pending)"),
        ),
        _ => section.warn("Active vs pending name", "could not compare"),
    }
    section
}
