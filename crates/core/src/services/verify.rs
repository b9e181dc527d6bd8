//! Reconciliation: re-read every source and classify each identifier.
//!
//! Two independent checks run per field. The snapshot check compares the
//! authoritative value with the backed-up original. The cross-source check
//! compares mirrors and observers with the authoritative value. Only the
//! snapshot check can FAIL, and only for a class that was spoofed since the
//! backup; cross-source disagreement is at most a WARN.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::model::{
    FieldReading, IdentifierClass, LocationRole, Observation, SourceKind, ValueFormat,
};
use crate::snapshot::{Snapshot, SpoofJournal};
use crate::sources::Sources;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Pass,
    Fail,
    Warn,
    Info,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VerdictStatus::Pass => "PASS",
            VerdictStatus::Fail => "FAIL",
            VerdictStatus::Warn => "WARN",
            VerdictStatus::Info => "INFO",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: String,
    pub status: VerdictStatus,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
}

impl Verdict {
    fn new(label: impl Into<String>, status: VerdictStatus, detail: impl Into<String>) -> Self {
        Self { label: label.into(), status, detail: detail.into(), current: None, baseline: None }
    }

    fn values(mut self, current: Option<&str>, baseline: Option<&str>) -> Self {
        self.current = current.map(str::to_string);
        self.baseline = baseline.map(str::to_string);
        self
    }
}

/// Verdict counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub info: usize,
}

impl Tally {
    fn add(&mut self, status: VerdictStatus) {
        match status {
            VerdictStatus::Pass => self.passed += 1,
            VerdictStatus::Fail => self.failed += 1,
            VerdictStatus::Warn => self.warnings += 1,
            VerdictStatus::Info => self.info += 1,
        }
    }

    fn merge(&mut self, other: Tally) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.warnings += other.warnings;
        self.info += other.info;
    }

    pub fn outcome(&self) -> Outcome {
        if self.failed > 0 {
            Outcome::Incomplete
        } else if self.warnings > 0 {
            Outcome::RebootPending
        } else if self.passed > 0 {
            Outcome::FullySpoofed
        } else {
            Outcome::NotVerified
        }
    }
}

/// Summary banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Every checked identifier changed and nothing disagrees.
    FullySpoofed,
    /// Nothing failed but some sources have not caught up yet.
    RebootPending,
    /// At least one identifier still matches its original.
    Incomplete,
    /// Nothing could be compared (no backup, or nothing spoofed).
    NotVerified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassVerification {
    pub class: IdentifierClass,
    pub spoofed_since_backup: bool,
    pub verdicts: Vec<Verdict>,
}

impl ClassVerification {
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for verdict in &self.verdicts {
            tally.add(verdict.status);
        }
        tally
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub snapshot_present: bool,
    pub classes: Vec<ClassVerification>,
}

impl VerificationReport {
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for class in &self.classes {
            tally.merge(class.tally());
        }
        tally
    }

    pub fn outcome(&self) -> Outcome {
        self.tally().outcome()
    }

    pub fn class(&self, class: IdentifierClass) -> Option<&ClassVerification> {
        self.classes.iter().find(|c| c.class == class)
    }
}

pub struct Verifier<'a> {
    catalog: &'a Catalog,
    sources: Sources<'a>,
    snapshot: Option<&'a Snapshot>,
    journal: SpoofJournal,
}

impl<'a> Verifier<'a> {
    pub fn new(catalog: &'a Catalog, sources: Sources<'a>) -> Self {
        Self { catalog, sources, snapshot: None, journal: SpoofJournal::default() }
    }

    pub fn with_snapshot(mut self, snapshot: Option<&'a Snapshot>) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn with_journal(mut self, journal: SpoofJournal) -> Self {
        self.journal = journal;
        self
    }

    /// Evaluate every class; one class never blocks another.
    pub fn run(&self) -> VerificationReport {
        let classes: Vec<ClassVerification> =
            self.catalog.list_classes().into_iter().map(|class| self.verify_class(class)).collect();
        let report = VerificationReport { snapshot_present: self.snapshot.is_some(), classes };
        let tally = report.tally();
        info!(
            passed = tally.passed,
            failed = tally.failed,
            warnings = tally.warnings,
            outcome = ?tally.outcome(),
            "verification finished"
        );
        report
    }

    fn verify_class(&self, class: IdentifierClass) -> ClassVerification {
        let spoofed = self.journal.was_spoofed(class);
        let mut verdicts = Vec::new();
        match self.catalog.read(class, &self.sources) {
            Ok(readings) => {
                for reading in &readings {
                    verdicts.extend(self.verify_field(class, spoofed, reading));
                }
            }
            Err(err) => verdicts.push(Verdict::new(
                class.label(),
                VerdictStatus::Warn,
                format!("could not read: {err}"),
            )),
        }
        ClassVerification { class, spoofed_since_backup: spoofed, verdicts }
    }

    fn verify_field(
        &self,
        class: IdentifierClass,
        spoofed: bool,
        reading: &FieldReading,
    ) -> Vec<Verdict> {
        let field = &reading.field;
        let format = field.format;
        let current = reading
            .target_value()
            .or_else(|| reading.current())
            .map(|value| format.render(value));
        let mut verdicts = vec![self.snapshot_verdict(class, spoofed, reading, current.as_deref())];

        if let Some(target) = reading.target_value().map(|v| format.render(v)) {
            for observation in &reading.observations {
                if let Some(verdict) = cross_source_verdict(&field.label, format, &target, observation)
                {
                    verdicts.push(verdict);
                }
            }
        }

        if format == ValueFormat::MacAddress {
            if let Some(address) = current.as_deref().filter(|a| format.is_well_formed(a)) {
                if !locally_administered(&format.normalize(address)) {
                    verdicts.push(
                        Verdict::new(
                            field.label.clone(),
                            VerdictStatus::Warn,
                            "address is not locally administered",
                        )
                        .values(Some(address), None),
                    );
                }
            }
        }
        debug!(class = class.slug(), field = %field.key, verdicts = verdicts.len(), "field verified");
        verdicts
    }

    fn snapshot_verdict(
        &self,
        class: IdentifierClass,
        spoofed: bool,
        reading: &FieldReading,
        current: Option<&str>,
    ) -> Verdict {
        let field = &reading.field;
        let label = field.label.clone();
        let baseline = self.snapshot.and_then(|s| s.get(class, &field.key));

        if !field.is_writable() {
            let verdict = if spoofed && self.snapshot.is_some() {
                Verdict::new(label, VerdictStatus::Warn, "read-only source, value cannot be changed")
            } else {
                Verdict::new(label, VerdictStatus::Info, "read-only source")
            };
            return verdict.values(current, baseline.flatten());
        }

        let Some(snapshot_value) = baseline else {
            let detail = if self.snapshot.is_some() { "not in backup" } else { "no backup to compare" };
            return Verdict::new(label, VerdictStatus::Info, detail).values(current, None);
        };

        let verdict = match (snapshot_value, current) {
            (None, None) => Verdict::new(label, VerdictStatus::Info, "not set"),
            (None, Some(value)) => {
                if field.format.is_well_formed(value) {
                    Verdict::new(label, VerdictStatus::Pass, "changed (was not set)")
                } else {
                    Verdict::new(label, VerdictStatus::Warn, "changed but malformed")
                }
            }
            (Some(_), None) => Verdict::new(label, VerdictStatus::Warn, "missing, backup has a value"),
            (Some(original), Some(value)) if field.format.same_value(original, value) => {
                if spoofed {
                    Verdict::new(label, VerdictStatus::Fail, "still matches original")
                } else {
                    Verdict::new(label, VerdictStatus::Info, "matches backup (not spoofed)")
                }
            }
            (Some(_), Some(value)) => {
                if field.format.is_well_formed(value) {
                    Verdict::new(label, VerdictStatus::Pass, "changed")
                } else {
                    Verdict::new(label, VerdictStatus::Warn, "changed but malformed")
                }
            }
        };
        verdict.values(current, snapshot_value)
    }
}

fn cross_source_verdict(
    label: &str,
    format: ValueFormat,
    target: &str,
    observation: &Observation,
) -> Option<Verdict> {
    let location = &observation.location;
    if !matches!(location.role, LocationRole::Mirror | LocationRole::Observer) {
        return None;
    }
    let value = format.render(observation.value.as_ref()?);
    let label = format!("{label} [{}]", location.locator);
    if format.same_value(target, &value) {
        if location.role == LocationRole::Observer {
            return Some(Verdict::new(label, VerdictStatus::Info, "in sync").values(Some(&value), None));
        }
        return None;
    }
    let detail = match (location.role, location.kind()) {
        (LocationRole::Mirror, SourceKind::ConfigStore) => "mirror differs (partial apply)",
        (_, SourceKind::LiveState) => "live value differs (restart or reboot pending)",
        _ => "differs (reboot pending)",
    };
    Some(Verdict::new(label, VerdictStatus::Warn, detail).values(Some(&value), Some(target)))
}

/// Locally-administered bit of the first octet.
fn locally_administered(address: &str) -> bool {
    address
        .get(..2)
        .and_then(|octet| u8::from_str_radix(octet, 16).ok())
        .is_some_and(|octet| octet & 0x02 == 0x02)
}
