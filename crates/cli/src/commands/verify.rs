use anyhow::{Context, Result};
use hwid_core::services::{DiagnosticReport, Verifier};

use crate::commands::AppContext;
use crate::render::render_verification;

/// Re-read every source and compare with the backup.
pub fn verify_command(ctx: &AppContext) -> Result<()> {
    let snapshot = ctx
        .snapshots
        .load()
        .with_context(|| format!("Failed to read backup: {}", ctx.layout.snapshot_path.display()))?;
    let journal = ctx.snapshots.load_journal().with_context(|| {
        format!("Failed to read spoof journal: {}", ctx.layout.journal_path.display())
    })?;

    let report = Verifier::new(&ctx.catalog, ctx.sources())
        .with_snapshot(snapshot.as_ref())
        .with_journal(journal)
        .run();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_verification(&report));
    }
    Ok(())
}

/// Write a read-only diagnostic dump next to the backup.
pub fn diagnostics_command(ctx: &AppContext) -> Result<()> {
    let report =
        DiagnosticReport::collect(&ctx.catalog, &ctx.sources(), &ctx.config, ctx.privilege);
    let path = report.write_to(&ctx.layout.diagnostics_dir).with_context(|| {
        format!("Failed to write diagnostic log in {}", ctx.layout.diagnostics_dir.display())
    })?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Diagnostic log written to {}", path.display());
        println!("Errors: {}  Warnings: {}", report.errors(), report.warnings());
    }
    Ok(())
}
