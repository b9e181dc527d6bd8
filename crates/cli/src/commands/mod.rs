pub mod context;
pub mod identity;
pub mod simulation;
pub mod snapshot;
pub mod verify;

pub use context::*;
pub use identity::*;
pub use simulation::*;
pub use snapshot::*;
pub use verify::*;
