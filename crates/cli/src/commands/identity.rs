use std::collections::BTreeMap;
use std::io::BufRead;

use anyhow::{Context, Result};
use hwid_core::model::CurrentValue;
use hwid_core::services::{Orchestrator, SpoofScope};
use tracing::warn;

use crate::commands::AppContext;
use crate::confirm;
use crate::render::{render_current, render_run_report};

/// Print the current value of every identifier.
pub fn show_command(ctx: &AppContext) -> Result<()> {
    let sources = ctx.sources();
    let mut by_class: BTreeMap<&str, Vec<CurrentValue>> = BTreeMap::new();
    for class in ctx.catalog.list_classes() {
        match ctx.catalog.get_current(class, &sources) {
            Ok(values) => {
                if !ctx.json {
                    print!("{}", render_current(class, &values));
                }
                by_class.insert(class.slug(), values);
            }
            Err(err) if ctx.json => {
                warn!(class = class.slug(), error = %err, "class not shown");
            }
            Err(err) => println!("[{}]\n  ERROR: {err}", class.label()),
        }
    }
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&by_class)?);
    }
    Ok(())
}

/// Spoof one class or all of them, after confirmation.
pub fn spoof_command(ctx: &AppContext, scope: SpoofScope, input: &mut dyn BufRead) -> Result<()> {
    let mut orchestrator = Orchestrator::new(&ctx.catalog, ctx.sources(), ctx.privilege)
        .with_journal(&ctx.snapshots);
    orchestrator.request(scope).context("Spoofing refused")?;

    let backup_path = ctx.layout.snapshot_path.display();
    match ctx.snapshots.load() {
        Ok(Some(_)) => {}
        Ok(None) if !ctx.json => {
            println!("No backup found. Without one, originals cannot be verified or restored.");
        }
        Ok(None) => {}
        Err(err) => {
            warn!(path = %backup_path, error = %err, "backup unreadable");
            if !ctx.json {
                println!(
                    "Backup at {backup_path} is unreadable ({err}). \
                     Originals cannot be verified or restored."
                );
            }
        }
    }
    let what = match scope {
        SpoofScope::All => "all identifiers".to_string(),
        SpoofScope::Single(class) => class.label().to_string(),
    };
    let approved = ctx.assume_yes || confirm(&format!("Spoof {what}?"), input)?;

    let report = ctx.with_rng(|rng| orchestrator.confirm(approved, rng))?;
    let Some(report) = report else {
        println!("Cancelled.");
        return Ok(());
    };
    ctx.platform.persist()?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_run_report(&report));
    }
    Ok(())
}
