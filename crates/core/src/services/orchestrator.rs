//! Spoof runs: a confirm-gated state machine over the catalog.
//!
//! `Idle -> Confirm -> Applying -> Reported`. Declining at the confirm gate goes
//! back to `Idle` without touching anything. Classes are applied one after
//! another; a failing class is recorded and the run moves on.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{Catalog, ClassOutcome};
use crate::error::{EngineError, EngineResult, Privilege};
use crate::model::IdentifierClass;
use crate::snapshot::SnapshotStore;
use crate::sources::Sources;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Confirm,
    Applying,
    Reported,
}

/// Which classes a run touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpoofScope {
    All,
    Single(IdentifierClass),
}

/// Per-class outcomes of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<ClassOutcome>,
}

impl RunReport {
    /// Identifiers whose authoritative location took a new value.
    pub fn total_changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.identifiers_changed())
            .sum()
    }

    pub fn total_locations(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.locations_changed())
            .sum()
    }

    pub fn failed_classes(&self) -> Vec<IdentifierClass> {
        self.outcomes.iter().filter(|o| o.result.is_err()).map(|o| o.class).collect()
    }
}

pub struct Orchestrator<'a> {
    catalog: &'a Catalog,
    sources: Sources<'a>,
    privilege: Privilege,
    journal: Option<&'a SnapshotStore>,
    state: RunState,
    pending: Option<SpoofScope>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(catalog: &'a Catalog, sources: Sources<'a>, privilege: Privilege) -> Self {
        Self { catalog, sources, privilege, journal: None, state: RunState::Idle, pending: None }
    }

    /// Record spoofed classes in `store`'s journal.
    pub fn with_journal(mut self, store: &'a SnapshotStore) -> Self {
        self.journal = Some(store);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Ask to spoof `scope`; moves to `Confirm`. Refused without elevation.
    pub fn request(&mut self, scope: SpoofScope) -> EngineResult<()> {
        if !matches!(self.state, RunState::Idle | RunState::Reported) {
            return Err(EngineError::InvalidState(format!(
                "cannot request a run while {:?}",
                self.state
            )));
        }
        self.privilege.require("Spoofing")?;
        if let SpoofScope::Single(class) = scope {
            self.catalog.entry(class)?;
        }
        self.pending = Some(scope);
        self.state = RunState::Confirm;
        Ok(())
    }

    /// Answer the confirm gate. Declining returns `None` and goes back to `Idle`.
    pub fn confirm(
        &mut self,
        approved: bool,
        rng: &mut dyn RngCore,
    ) -> EngineResult<Option<RunReport>> {
        if self.state != RunState::Confirm {
            return Err(EngineError::InvalidState(format!(
                "nothing to confirm while {:?}",
                self.state
            )));
        }
        let Some(scope) = self.pending.take() else {
            return Err(EngineError::InvalidState("no pending run".to_string()));
        };
        if !approved {
            info!("run declined");
            self.state = RunState::Idle;
            return Ok(None);
        }

        self.state = RunState::Applying;
        let outcomes = match scope {
            SpoofScope::All => self.catalog.spoof_all(&self.sources, rng, self.journal),
            SpoofScope::Single(class) => {
                self.catalog.spoof_classes(&[class], &self.sources, rng, self.journal)
            }
        };
        let report = RunReport { outcomes };
        info!(changed = report.total_changed(), locations = report.total_locations(), "run finished");
        self.state = RunState::Reported;
        Ok(Some(report))
    }

    /// Request and approve in one step.
    pub fn run(&mut self, scope: SpoofScope, rng: &mut dyn RngCore) -> EngineResult<RunReport> {
        self.request(scope)?;
        Ok(self.confirm(true, rng)?.unwrap_or_default())
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.state = RunState::Idle;
    }
}
