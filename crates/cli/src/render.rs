//! Human-readable rendering of engine results. Pure string building.

use hwid_core::model::CurrentValue;
use hwid_core::services::{Outcome, RunReport, VerificationReport};
use hwid_core::snapshot::{BackupReport, RestoreReport};
use hwid_core::{IdentifierClass, SpoofResult};

/// Values longer than this are cut in tables.
pub const VALUE_WIDTH: usize = 36;
pub const NOT_SET: &str = "(not set)";

/// Cut `value` to `width` characters, marking the cut with `...`.
pub fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let keep = width.saturating_sub(3);
    format!("{}...", value.chars().take(keep).collect::<String>())
}

fn or_not_set(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_SET)
}

pub fn render_current(class: IdentifierClass, values: &[CurrentValue]) -> String {
    let mut out = format!("[{}]\n", class.label());
    if values.is_empty() {
        out.push_str("  (no identifiers found)\n");
    }
    let width = values.iter().map(|v| v.label.chars().count()).max().unwrap_or(0);
    for value in values {
        out.push_str(&format!(
            "  {:<width$}  {}\n",
            value.label,
            truncate(or_not_set(value.value.as_deref()), VALUE_WIDTH * 2),
        ));
    }
    out
}

pub fn render_spoof_result(result: &SpoofResult) -> String {
    let mut out = format!("[{}]\n", result.class.label());
    if result.changes.is_empty() {
        out.push_str("  nothing to change\n");
    }
    for change in &result.changes {
        let marker = if change.target_applied { "+" } else { "!" };
        out.push_str(&format!(
            "  {marker} {}: {} -> {} ({} location{})\n",
            change.label,
            truncate(or_not_set(change.old.as_deref()), VALUE_WIDTH),
            truncate(or_not_set(change.new.as_deref()), VALUE_WIDTH),
            change.applied,
            if change.applied == 1 { "" } else { "s" },
        ));
        for error in &change.errors {
            out.push_str(&format!("      failed at {}: {}\n", error.location, error.error));
        }
    }
    for note in &result.notes {
        out.push_str(&format!("  * {note}\n"));
    }
    out
}

pub fn render_run_report(report: &RunReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(result) => out.push_str(&render_spoof_result(result)),
            Err(err) => out.push_str(&format!("[{}]\n  ERROR: {err}\n", outcome.class.label())),
        }
    }
    out.push_str(&format!(
        "\nChanged {} identifier(s) across {} location(s).\n",
        report.total_changed(),
        report.total_locations()
    ));
    if !report.failed_classes().is_empty() {
        out.push_str("Some classes failed; see the errors above.\n");
    }
    out.push_str("Reboot to apply all changes.\n");
    out
}

pub fn render_backup(report: &BackupReport) -> String {
    let mut out =
        format!("Backup saved to {} ({} values).\n", report.path.display(), report.entries);
    for (class, err) in &report.failed_classes {
        out.push_str(&format!("  {} not captured: {err}\n", class.label()));
    }
    out
}

pub fn render_restore(report: &RestoreReport) -> String {
    let mut out = format!("Restored {} value(s).\n", report.restored_count());
    for key in &report.restored {
        out.push_str(&format!("  + {key}\n"));
    }
    for key in &report.failed {
        out.push_str(&format!("  ! {key} could not be written\n"));
    }
    if report.skipped > 0 {
        out.push_str(&format!(
            "{} other value(s) cannot be restored and were left as they are.\n",
            report.skipped
        ));
    }
    out.push_str("Reboot to apply.\n");
    out
}

pub fn banner(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::FullySpoofed => "FULLY SPOOFED: every identifier changed.",
        Outcome::RebootPending => "MOSTLY SPOOFED: some sources lag behind, reboot to finish.",
        Outcome::Incomplete => {
            "INCOMPLETE: some identifiers still match the backup; re-run as Administrator."
        }
        Outcome::NotVerified => "NOT VERIFIED: nothing to compare. Take a backup before spoofing.",
    }
}

pub fn render_verification(report: &VerificationReport) -> String {
    let mut out = String::new();
    if !report.snapshot_present {
        out.push_str("No backup found; values cannot be compared with originals.\n\n");
    }
    for class in &report.classes {
        out.push_str(&format!("[{}]\n", class.class.label()));
        for verdict in &class.verdicts {
            out.push_str(&format!(
                "  [{}] {}: {}",
                verdict.status,
                truncate(&verdict.label, VALUE_WIDTH * 2),
                verdict.detail
            ));
            if let Some(current) = &verdict.current {
                out.push_str(&format!(" (now {}", truncate(current, VALUE_WIDTH)));
                if let Some(baseline) = &verdict.baseline {
                    out.push_str(&format!(", was {}", truncate(baseline, VALUE_WIDTH)));
                }
                out.push(')');
            }
            out.push('\n');
        }
    }
    let tally = report.tally();
    out.push_str(&format!(
        "\nPassed: {}  Failed: {}  Warnings: {}\n{}\n",
        tally.passed,
        tally.failed,
        tally.warnings,
        banner(tally.outcome())
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_marks_cut_values() {
        assert_eq!(truncate("short", 36), "short");
        let long = "x".repeat(40);
        let cut = truncate(&long, 36);
        assert_eq!(cut.chars().count(), 36);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn banners_are_distinct() {
        let all = [
            Outcome::FullySpoofed,
            Outcome::RebootPending,
            Outcome::Incomplete,
            Outcome::NotVerified,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(banner(*a), banner(*b));
            }
        }
    }
}
