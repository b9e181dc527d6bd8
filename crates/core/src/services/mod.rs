//! Operations built on the catalog: spoof runs, verification and diagnostics.

pub mod diagnostics;
pub mod orchestrator;
pub mod verify;

pub use diagnostics::{DiagnosticItem, DiagnosticLevel, DiagnosticReport, DiagnosticSection};
pub use orchestrator::{Orchestrator, RunReport, RunState, SpoofScope};
pub use verify::{
    ClassVerification, Outcome, Tally, VerdictStatus, Verdict, VerificationReport, Verifier,
};
