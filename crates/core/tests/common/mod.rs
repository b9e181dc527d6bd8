#![allow(dead_code)]

use std::path::Path;

use hwid_core::sources::fixture::MachineFixture;
use hwid_core::sources::memory::MemoryMachine;
use hwid_core::{Catalog, EngineConfig, SnapshotStore};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Defaults without the adapter restart pause.
pub fn test_config() -> EngineConfig {
    EngineConfig { adapter_restart_pause_ms: 0, ..EngineConfig::default() }
}

pub fn sample_machine() -> MemoryMachine {
    MemoryMachine::from_fixture(MachineFixture::sample())
}

pub fn catalog() -> Catalog {
    Catalog::standard(&test_config())
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn store_in(dir: &Path) -> SnapshotStore {
    SnapshotStore::new(dir.join("hwid_backup.json"), dir.join("hwid_journal.json"))
}
