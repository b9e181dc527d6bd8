//! hwid-core
//!
//! Engine for altering and later verifying machine-identity values that live in
//! several independent operating-system sources: the per-machine configuration
//! store, the hardware-inventory query service, and live OS-reported state.
//!
//! The crate keeps all substantive logic here so it is fully testable against
//! the in-memory backend and reusable from multiple frontends (CLI, services).
//! Rendering for humans lives in the frontend; everything in this crate returns
//! plain data.

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generators;
pub mod model;
pub mod services;
pub mod snapshot;
pub mod sources;

pub use catalog::{Catalog, CatalogEntry, ClassOutcome, FieldChange, SpoofResult};
pub use config::{load_config, EngineConfig, EngineLayout};
pub use error::{EngineError, EngineResult, Privilege};
pub use model::IdentifierClass;
pub use snapshot::{Snapshot, SnapshotStore, SpoofJournal};
pub use sources::Sources;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
