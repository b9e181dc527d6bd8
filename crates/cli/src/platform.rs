//! Which machine the CLI operates on: the real host, or a simulated one loaded
//! from a fixture file and saved back after every mutation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hwid_core::sources::memory::MemoryMachine;
use hwid_core::sources::{LiveState, Sources};

pub enum Platform {
    Simulated { machine: MemoryMachine, path: PathBuf },
    #[cfg(windows)]
    Native {
        store: hwid_core::sources::windows::RegistryStore,
        inventory: hwid_core::sources::windows::WmicInventory,
        live: hwid_core::sources::windows::HostLiveState,
    },
}

impl Platform {
    pub fn simulated(path: &Path) -> Result<Self> {
        let machine = MemoryMachine::load(path)
            .with_context(|| format!("Failed to load simulation fixture: {}", path.display()))?;
        Ok(Platform::Simulated { machine, path: path.to_path_buf() })
    }

    #[cfg(windows)]
    pub fn native() -> Result<Self> {
        use hwid_core::sources::windows::{HostLiveState, RegistryStore, WmicInventory};
        Ok(Platform::Native {
            store: RegistryStore::new(),
            inventory: WmicInventory,
            live: HostLiveState,
        })
    }

    #[cfg(not(windows))]
    pub fn native() -> Result<Self> {
        anyhow::bail!(
            "No native backend on this platform; run with --simulate <fixture> \
             (create one with `hwid-spoofer init-simulation <path>`)"
        )
    }

    pub fn sources(&self) -> Sources<'_> {
        match self {
            Platform::Simulated { machine, .. } => machine.sources(),
            #[cfg(windows)]
            Platform::Native { store, inventory, live } => Sources::new(store, inventory, live),
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.sources().live.is_elevated()
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, Platform::Simulated { .. })
    }

    /// Save a simulated machine back to its fixture. No-op on the real host.
    pub fn persist(&self) -> Result<()> {
        match self {
            Platform::Simulated { machine, path } => machine
                .save(path)
                .with_context(|| format!("Failed to save simulation fixture: {}", path.display())),
            #[cfg(windows)]
            Platform::Native { .. } => Ok(()),
        }
    }
}
