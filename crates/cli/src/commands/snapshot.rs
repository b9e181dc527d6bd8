use std::io::BufRead;

use anyhow::{anyhow, Context, Result};

use crate::commands::AppContext;
use crate::confirm;
use crate::render::{render_backup, render_restore};

/// Capture every current value into the backup file.
pub fn backup_command(ctx: &AppContext) -> Result<()> {
    if let Some(parent) = ctx.layout.snapshot_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create backup dir: {}", parent.display()))?;
    }
    let report = ctx
        .snapshots
        .backup(&ctx.catalog, &ctx.sources())
        .with_context(|| format!("Failed to write backup: {}", ctx.layout.snapshot_path.display()))?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_backup(&report));
    }
    Ok(())
}

/// Write the backed-up machine GUID and computer name back.
pub fn restore_command(ctx: &AppContext, input: &mut dyn BufRead) -> Result<()> {
    ctx.privilege.require("Restore").context("Restore refused")?;
    let snapshot = ctx
        .snapshots
        .load()
        .with_context(|| format!("Failed to read backup: {}", ctx.layout.snapshot_path.display()))?
        .ok_or_else(|| {
            anyhow!("No backup found at {}", ctx.layout.snapshot_path.display())
        })?;

    let approved = ctx.assume_yes || confirm("Restore machine GUID and computer name?", input)?;
    if !approved {
        println!("Cancelled.");
        return Ok(());
    }

    let report = ctx
        .snapshots
        .restore(&snapshot, &ctx.catalog, &ctx.sources(), ctx.privilege)
        .context("Restore failed")?;
    ctx.platform.persist()?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_restore(&report));
    }
    Ok(())
}
