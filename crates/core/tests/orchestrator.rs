mod common;

use hwid_core::adapters::{paths, SourceAdapter};
use hwid_core::model::{Field, IdentifierClass, StoreValue};
use hwid_core::services::{Orchestrator, RunState, SpoofScope};
use hwid_core::sources::{ConfigStore, SourceError, SourceResult, Sources};
use hwid_core::{Catalog, EngineError, Privilege};
use tempfile::tempdir;

use common::{catalog, rng, sample_machine, store_in, test_config};

/// Declining at the confirm gate returns to Idle and changes nothing.
#[test]
fn declining_leaves_everything_untouched() {
    let machine = sample_machine();
    let catalog = catalog();
    let before = machine.to_fixture();

    let mut orchestrator = Orchestrator::new(&catalog, machine.sources(), Privilege::Elevated);
    orchestrator.request(SpoofScope::All).expect("request");
    assert_eq!(orchestrator.state(), RunState::Confirm);
    let report = orchestrator.confirm(false, &mut rng(1)).expect("confirm");
    assert!(report.is_none());
    assert_eq!(orchestrator.state(), RunState::Idle);
    assert_eq!(machine.to_fixture(), before);
}

/// A standard user cannot request a spoof run.
#[test]
fn spoofing_requires_elevation() {
    let machine = sample_machine();
    let catalog = catalog();
    let mut orchestrator = Orchestrator::new(&catalog, machine.sources(), Privilege::Standard);
    let err = orchestrator.request(SpoofScope::All).expect_err("refused");
    assert!(matches!(err, EngineError::NotElevated { .. }));
    assert_eq!(orchestrator.state(), RunState::Idle);
}

/// Confirming with nothing requested is an invalid state.
#[test]
fn confirm_without_request_is_invalid() {
    let machine = sample_machine();
    let catalog = catalog();
    let mut orchestrator = Orchestrator::new(&catalog, machine.sources(), Privilege::Elevated);
    let err = orchestrator.confirm(true, &mut rng(1)).expect_err("nothing pending");
    assert!(matches!(err, EngineError::InvalidState(_)));
}

/// A single-class run changes and journals only that class.
#[test]
fn single_class_run_touches_only_that_class() {
    let dir = tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let machine = sample_machine();
    let catalog = catalog();

    let mut orchestrator = Orchestrator::new(&catalog, machine.sources(), Privilege::Elevated)
        .with_journal(&store);
    let report = orchestrator
        .run(SpoofScope::Single(IdentifierClass::MachineGuid), &mut rng(2))
        .expect("run");
    assert_eq!(orchestrator.state(), RunState::Reported);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.total_changed(), 1);
    assert_eq!(
        machine.read(paths::COMPUTER_NAME_PENDING, "ComputerName").expect("read"),
        Some(StoreValue::text("DESKTOP-ORIG001"))
    );

    let journal = store.load_journal().expect("journal");
    assert!(journal.was_spoofed(IdentifierClass::MachineGuid));
    assert!(!journal.was_spoofed(IdentifierClass::ComputerName));

    // A reported run can be followed by another request.
    orchestrator.request(SpoofScope::All).expect("second request");
    orchestrator.reset();
    assert_eq!(orchestrator.state(), RunState::Idle);
}

/// Adapter whose enumeration always fails.
struct BrokenStorage;

impl SourceAdapter for BrokenStorage {
    fn class(&self) -> IdentifierClass {
        IdentifierClass::StorageSerial
    }

    fn fields(&self, _sources: &Sources) -> SourceResult<Vec<Field>> {
        Err(SourceError::AccessDenied("device map".to_string()))
    }
}

/// A class that fails to enumerate is reported while the other classes still run.
#[test]
fn failing_class_does_not_stop_the_run() {
    let dir = tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let machine = sample_machine();
    let mut catalog = Catalog::standard(&test_config());
    catalog.register(BrokenStorage);

    let mut orchestrator = Orchestrator::new(&catalog, machine.sources(), Privilege::Elevated)
        .with_journal(&store);
    let report = orchestrator.run(SpoofScope::All, &mut rng(3)).expect("run");

    assert_eq!(report.outcomes.len(), 6);
    assert_eq!(report.failed_classes(), vec![IdentifierClass::StorageSerial]);
    let product = report
        .outcomes
        .iter()
        .find(|o| o.class == IdentifierClass::ProductId)
        .expect("product outcome");
    assert!(product.result.is_ok());
    assert!(report.total_changed() > 0);

    let journal = store.load_journal().expect("journal");
    assert!(!journal.was_spoofed(IdentifierClass::StorageSerial));
    assert!(journal.was_spoofed(IdentifierClass::ProductId));
}

/// Run outcomes come back in the fixed class order.
#[test]
fn outcomes_follow_class_order() {
    let machine = sample_machine();
    let catalog = catalog();
    let mut orchestrator = Orchestrator::new(&catalog, machine.sources(), Privilege::Elevated);
    let report = orchestrator.run(SpoofScope::All, &mut rng(4)).expect("run");
    let order: Vec<IdentifierClass> = report.outcomes.iter().map(|o| o.class).collect();
    assert_eq!(order, IdentifierClass::ALL.to_vec());
    assert!(report.total_locations() >= report.total_changed());
}
