//! Engine-level errors and the privilege gate.

use thiserror::Error;

use crate::model::IdentifierClass;
use crate::snapshot::SnapshotError;
use crate::sources::SourceError;

/// Error type for class-level engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A mutating operation was requested without administrative rights.
    #[error("{action} requires administrator privileges")]
    NotElevated { action: String },

    #[error("Identifier class not registered: {0}")]
    UnknownClass(String),

    /// The adapter could not even work out which fields the class has.
    #[error("Failed to enumerate {class} fields: {source}")]
    Enumerate {
        class: IdentifierClass,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// An orchestrator transition was requested from the wrong state.
    #[error("Invalid run state: {0}")]
    InvalidState(String),
}

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Whether the process may mutate machine state. Probed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Elevated,
    Standard,
}

impl Privilege {
    pub fn from_elevated(elevated: bool) -> Self {
        if elevated {
            Privilege::Elevated
        } else {
            Privilege::Standard
        }
    }

    pub fn is_elevated(self) -> bool {
        self == Privilege::Elevated
    }

    /// Refuse `action` unless elevated.
    pub fn require(self, action: &str) -> EngineResult<()> {
        match self {
            Privilege::Elevated => Ok(()),
            Privilege::Standard => Err(EngineError::NotElevated { action: action.to_string() }),
        }
    }
}
