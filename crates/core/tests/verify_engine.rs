mod common;

use hwid_core::adapters::paths;
use hwid_core::model::StoreValue;
use hwid_core::services::{Outcome, VerificationReport, Verdict, VerdictStatus, Verifier};
use hwid_core::sources::memory::MemoryMachine;
use hwid_core::sources::ConfigStore;
use hwid_core::{Catalog, IdentifierClass, Snapshot, SpoofJournal};
use tempfile::tempdir;

use common::{catalog, rng, sample_machine, store_in};

fn snapshot_verdicts<'r>(
    report: &'r VerificationReport,
    class: IdentifierClass,
) -> Vec<&'r Verdict> {
    // Cross-source verdicts carry the location in brackets.
    report
        .class(class)
        .expect("class verified")
        .verdicts
        .iter()
        .filter(|v| !v.label.contains('[') && !v.detail.contains("locally administered"))
        .collect()
}

fn writable_labels(catalog: &Catalog, machine: &MemoryMachine) -> Vec<(IdentifierClass, String)> {
    IdentifierClass::ALL
        .iter()
        .flat_map(|class| {
            catalog
                .fields(*class, &machine.sources())
                .expect("fields")
                .into_iter()
                .filter(|f| f.is_writable())
                .map(move |f| (*class, f.label))
        })
        .collect()
}

/// Without a backup every snapshot verdict is informational.
#[test]
fn without_backup_nothing_is_verified() {
    let machine = sample_machine();
    let catalog = catalog();
    let report = Verifier::new(&catalog, machine.sources()).run();

    assert!(!report.snapshot_present);
    assert_eq!(report.tally().failed, 0);
    for class in IdentifierClass::ALL {
        for verdict in snapshot_verdicts(&report, class) {
            assert_eq!(verdict.status, VerdictStatus::Info, "{}", verdict.label);
        }
    }
}

/// Verifying right after a backup never fails and never passes.
#[test]
fn backup_then_verify_never_fails() {
    let dir = tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let machine = sample_machine();
    let catalog = catalog();
    store.backup(&catalog, &machine.sources()).expect("backup");
    let snapshot = store.load().expect("load");

    let report = Verifier::new(&catalog, machine.sources())
        .with_snapshot(snapshot.as_ref())
        .with_journal(store.load_journal().expect("journal"))
        .run();
    assert!(report.snapshot_present);
    assert_eq!(report.tally().failed, 0);
    assert_eq!(report.tally().passed, 0);
    assert_ne!(report.outcome(), Outcome::Incomplete);
}

/// Factory addresses without the locally-administered bit are warned about.
#[test]
fn factory_address_is_flagged() {
    let machine = sample_machine();
    let catalog = catalog();
    let report = Verifier::new(&catalog, machine.sources()).run();
    let network = report.class(IdentifierClass::NetworkAddress).expect("network");
    let flagged: Vec<&Verdict> = network
        .verdicts
        .iter()
        .filter(|v| v.detail.contains("not locally administered"))
        .collect();
    assert_eq!(flagged.len(), 2);
    assert!(flagged.iter().all(|v| v.status == VerdictStatus::Warn));
}

/// After spoof_all, writable fields pass and read-only fields warn.
#[test]
fn spoof_all_then_verify_passes_writable_and_warns_read_only() {
    let dir = tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let machine = sample_machine();
    let catalog = catalog();
    let sources = machine.sources();

    store.backup(&catalog, &sources).expect("backup");
    for outcome in catalog.spoof_all(&sources, &mut rng(5), Some(&store)) {
        assert!(outcome.result.is_ok(), "{:?}", outcome.class);
    }
    let snapshot = store.load().expect("load");
    let report = Verifier::new(&catalog, sources)
        .with_snapshot(snapshot.as_ref())
        .with_journal(store.load_journal().expect("journal"))
        .run();

    let writable = writable_labels(&catalog, &machine);
    assert!(!writable.is_empty());
    for class in IdentifierClass::ALL {
        for verdict in snapshot_verdicts(&report, class) {
            let is_writable = writable.iter().any(|(c, l)| *c == class && *l == verdict.label);
            let expected = if is_writable { VerdictStatus::Pass } else { VerdictStatus::Warn };
            assert_eq!(verdict.status, expected, "{}: {}", verdict.label, verdict.detail);
        }
    }

    // Read-only fields are reported, not omitted.
    let firmware = snapshot_verdicts(&report, IdentifierClass::Firmware);
    assert!(firmware.iter().any(|v| v.label == "BIOS Serial"));
    let storage = snapshot_verdicts(&report, IdentifierClass::StorageSerial);
    assert_eq!(storage.iter().filter(|v| v.label.contains("(inventory)")).count(), 2);

    assert_eq!(report.tally().failed, 0);
    assert_eq!(report.outcome(), Outcome::RebootPending);
}

/// spoof_all records its classes in the journal, so read-only fields warn on verify.
#[test]
fn spoof_all_journals_what_it_changed() {
    let dir = tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let machine = sample_machine();
    let catalog = catalog();
    let sources = machine.sources();

    store.backup(&catalog, &sources).expect("backup");
    let outcomes = catalog.spoof_all(&sources, &mut rng(1), Some(&store));
    assert!(outcomes.iter().all(|o| o.result.is_ok()));

    let journal = store.load_journal().expect("journal");
    assert!(IdentifierClass::ALL.iter().all(|class| journal.was_spoofed(*class)));

    let snapshot = store.load().expect("load");
    let report = Verifier::new(&catalog, sources)
        .with_snapshot(snapshot.as_ref())
        .with_journal(journal)
        .run();
    let firmware = snapshot_verdicts(&report, IdentifierClass::Firmware);
    let serial = firmware.iter().find(|v| v.label == "BIOS Serial").expect("bios serial");
    assert_eq!(serial.status, VerdictStatus::Warn);
    let product = snapshot_verdicts(&report, IdentifierClass::ProductId);
    let edition = product.iter().find(|v| v.label == "Edition ID").expect("edition");
    assert_eq!(edition.status, VerdictStatus::Warn);
    assert_eq!(report.outcome(), Outcome::RebootPending);
}

/// spoof_all without a journal leaves the stored journal alone.
#[test]
fn spoof_all_without_journal_records_nothing() {
    let dir = tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let machine = sample_machine();
    let catalog = catalog();

    store.backup(&catalog, &machine.sources()).expect("backup");
    catalog.spoof_all(&machine.sources(), &mut rng(2), None);
    assert!(store.load_journal().expect("journal").spoofed.is_empty());
}

/// Live and active names lag behind until the machine reboots.
#[test]
fn stale_sources_warn_until_reboot() {
    let dir = tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let machine = sample_machine();
    let catalog = catalog();
    let sources = machine.sources();

    store.backup(&catalog, &sources).expect("backup");
    catalog.spoof(IdentifierClass::ComputerName, &sources, &mut rng(6)).expect("spoof");
    store.record_spoof(IdentifierClass::ComputerName).expect("journal");
    let snapshot = store.load().expect("load");

    let verify = || {
        Verifier::new(&catalog, sources)
            .with_snapshot(snapshot.as_ref())
            .with_journal(store.load_journal().expect("journal"))
            .run()
    };
    let before = verify();
    let names = &before.class(IdentifierClass::ComputerName).expect("name").verdicts;
    let warned = |text: &str| {
        names.iter().any(|v| v.status == VerdictStatus::Warn && v.detail.contains(text))
    };
    assert!(warned("live value"));
    assert!(warned("reboot pending"));
    assert!(names.iter().all(|v| v.status != VerdictStatus::Fail));

    machine.reboot();
    let after = verify();
    let names = &after.class(IdentifierClass::ComputerName).expect("name").verdicts;
    assert!(names.iter().all(|v| v.status != VerdictStatus::Warn), "{names:?}");
    assert!(names.iter().any(|v| v.status == VerdictStatus::Pass));
    assert!(names.iter().any(|v| v.detail == "in sync"));
}

/// A journaled class whose value still matches the backup fails.
#[test]
fn spoofed_but_unchanged_is_a_failure() {
    let dir = tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let machine = sample_machine();
    let catalog = catalog();
    store.backup(&catalog, &machine.sources()).expect("backup");
    // Journal says spoofed, store still has the original.
    store.record_spoof(IdentifierClass::MachineGuid).expect("journal");
    let snapshot = store.load().expect("load");

    let report = Verifier::new(&catalog, machine.sources())
        .with_snapshot(snapshot.as_ref())
        .with_journal(store.load_journal().expect("journal"))
        .run();
    let verdicts = snapshot_verdicts(&report, IdentifierClass::MachineGuid);
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].status, VerdictStatus::Fail);
    assert_eq!(report.outcome(), Outcome::Incomplete);
}

/// Malformed or missing values warn; keys absent from the backup are informational.
#[test]
fn malformed_and_missing_values_warn() {
    let machine = sample_machine();
    let catalog = catalog();
    let mut snapshot = Snapshot::default();
    snapshot.insert(
        IdentifierClass::MachineGuid,
        "MachineGuid",
        Some("3f2504e0-4f89-41d3-9a0c-0305e82c3301".into()),
    );
    snapshot.insert(IdentifierClass::ProductId, "ProductId", Some("00330-80000-00000-AA123".into()));
    let journal = SpoofJournal {
        spoofed: [IdentifierClass::MachineGuid, IdentifierClass::ProductId].into_iter().collect(),
        ..SpoofJournal::default()
    };

    machine
        .write(paths::CRYPTOGRAPHY, "MachineGuid", &StoreValue::text("not-a-guid"))
        .expect("write");
    machine.delete(paths::WINDOWS_NT_CURRENT_VERSION, "ProductId").expect("delete");

    let report = Verifier::new(&catalog, machine.sources())
        .with_snapshot(Some(&snapshot))
        .with_journal(journal)
        .run();
    let guid = snapshot_verdicts(&report, IdentifierClass::MachineGuid);
    assert_eq!(guid[0].status, VerdictStatus::Warn);
    assert_eq!(guid[0].detail, "changed but malformed");

    let product = snapshot_verdicts(&report, IdentifierClass::ProductId);
    let product_id = product.iter().find(|v| v.label == "Product ID").expect("product id");
    assert_eq!(product_id.status, VerdictStatus::Warn);
    // Keys missing from the backup are informational.
    let build = product.iter().find(|v| v.label == "Build GUID").expect("build guid");
    assert_eq!(build.status, VerdictStatus::Info);
}

/// A mirror that kept the old value is reported as a partial apply.
#[test]
fn partial_apply_on_mirror_is_a_warning() {
    let machine = sample_machine();
    let catalog = catalog();
    machine
        .write(paths::COMPUTER_NAME_PENDING, "ComputerName", &StoreValue::text("DESKTOP-NEW00001"))
        .expect("write");
    machine
        .write(paths::TCPIP_PARAMETERS, "Hostname", &StoreValue::text("DESKTOP-NEW00001"))
        .expect("write");

    let report = Verifier::new(&catalog, machine.sources()).run();
    let names = &report.class(IdentifierClass::ComputerName).expect("name").verdicts;
    let partial: Vec<&Verdict> =
        names.iter().filter(|v| v.detail.contains("partial apply")).collect();
    assert_eq!(partial.len(), 1);
    assert!(partial[0].label.contains("NV Hostname"));
    assert_eq!(partial[0].status, VerdictStatus::Warn);
}
