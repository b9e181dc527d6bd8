mod common;

use chrono::{Local, TimeZone};
use hwid_core::services::{DiagnosticLevel, DiagnosticReport};
use hwid_core::sources::fixture::MachineFixture;
use hwid_core::sources::memory::MemoryMachine;
use hwid_core::{IdentifierClass, Privilege};
use tempfile::tempdir;

use common::{catalog, rng, sample_machine, test_config};

fn fixed_time() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("unambiguous local time")
}

/// A healthy machine produces every section, no errors and a timestamped file name.
#[test]
fn report_covers_every_section_without_errors() {
    let machine = sample_machine();
    let report = DiagnosticReport::collect_at(
        &catalog(),
        &machine.sources(),
        &test_config(),
        Privilege::Elevated,
        fixed_time(),
    );
    let titles: Vec<&str> = report.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Environment",
            "Identifier Locations",
            "Hardware Config",
            "Windows Build",
            "Network Adapters (store)",
            "Storage Device Map",
            "Inventory",
            "Live Interfaces",
            "Consistency Checks",
        ]
    );
    assert_eq!(report.errors(), 0);
    assert_eq!(report.file_name(), "hwid_debug_20240309_140507.log");

    let adapters =
        report.sections.iter().find(|s| s.title.starts_with("Network")).expect("adapters");
    let virtual_count =
        adapters.items.iter().filter(|i| i.value.contains("(virtual, excluded)")).count();
    assert_eq!(virtual_count, 3);
}

/// An active name that differs from the pending one adds a warning.
#[test]
fn pending_rename_shows_up_as_a_warning() {
    let machine = sample_machine();
    let catalog = catalog();
    let sources = machine.sources();
    let collect = || {
        DiagnosticReport::collect_at(
            &catalog,
            &sources,
            &test_config(),
            Privilege::Elevated,
            fixed_time(),
        )
    };
    let baseline = collect();

    catalog.spoof(IdentifierClass::ComputerName, &sources, &mut rng(1)).expect("spoof");
    let report = collect();
    let checks = report.sections.iter().find(|s| s.title == "Consistency Checks").expect("checks");
    let pending = checks.items.iter().find(|i| i.label == "Active vs pending name").expect("item");
    assert_eq!(pending.level, DiagnosticLevel::Warning);
    assert!(pending.value.contains("reboot pending"));
    assert_eq!(report.warnings(), baseline.warnings() + 1);
}

/// Missing elevation and empty inventory classes are flagged as warnings.
#[test]
fn standard_user_and_empty_inventory_are_flagged() {
    let fixture = MachineFixture {
        elevated: false,
        inventory: Default::default(),
        ..MachineFixture::sample()
    };
    let machine = MemoryMachine::from_fixture(fixture);
    let report = DiagnosticReport::collect_at(
        &catalog(),
        &machine.sources(),
        &test_config(),
        Privilege::Standard,
        fixed_time(),
    );
    let environment = &report.sections[0];
    let elevated = environment.items.iter().find(|i| i.label == "Elevated").expect("elevated");
    assert_eq!(elevated.level, DiagnosticLevel::Warning);

    let inventory = report.sections.iter().find(|s| s.title == "Inventory").expect("inventory");
    assert!(inventory.items.iter().all(|i| i.level == DiagnosticLevel::Warning));
}

/// The written log ends with the error and warning summary.
#[test]
fn written_log_has_summary_footer() {
    let dir = tempdir().expect("tempdir");
    let machine = sample_machine();
    let report = DiagnosticReport::collect_at(
        &catalog(),
        &machine.sources(),
        &test_config(),
        Privilege::Elevated,
        fixed_time(),
    );
    let path = report.write_to(&dir.path().join("logs")).expect("write log");
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("hwid_debug_20240309_140507.log"));

    let text = std::fs::read_to_string(&path).expect("read log");
    assert!(text.contains("==== Environment ===="));
    assert!(text.contains("Win32_BIOS[0].SerialNumber: System Serial Number"));
    assert!(text.contains("==== Summary ===="));
    assert!(text.contains(&format!("Warnings: {}", report.warnings())));
}
