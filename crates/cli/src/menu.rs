//! Numbered interactive menu over the same commands the subcommands expose.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use hwid_core::services::SpoofScope;
use hwid_core::IdentifierClass;

use crate::commands::{
    backup_command, diagnostics_command, restore_command, show_command, spoof_command,
    verify_command, AppContext,
};

/// A menu entry resolved from the user's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Show,
    Spoof(SpoofScope),
    Backup,
    Restore,
    Verify,
    Diagnostics,
    Exit,
}

/// Numbering: 1 show, 2 spoof all, 3.. one per class, then backup, restore,
/// verify, diagnostics. 0 exits.
pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    let n: usize = input.trim().parse().ok()?;
    let classes = IdentifierClass::ALL.len();
    let choice = match n {
        0 => MenuChoice::Exit,
        1 => MenuChoice::Show,
        2 => MenuChoice::Spoof(SpoofScope::All),
        n if (3..3 + classes).contains(&n) => {
            MenuChoice::Spoof(SpoofScope::Single(IdentifierClass::ALL[n - 3]))
        }
        n if n == 3 + classes => MenuChoice::Backup,
        n if n == 4 + classes => MenuChoice::Restore,
        n if n == 5 + classes => MenuChoice::Verify,
        n if n == 6 + classes => MenuChoice::Diagnostics,
        _ => return None,
    };
    Some(choice)
}

pub fn menu_text(elevated: bool) -> String {
    let mut out = String::from("\n==== HWID Spoofer ====\n");
    if !elevated {
        out.push_str("(not elevated: spoof and restore are unavailable)\n");
    }
    out.push_str(" 1) Show current identifiers\n");
    out.push_str(" 2) Spoof all identifiers\n");
    let mut n = 3;
    for class in IdentifierClass::ALL {
        out.push_str(&format!("{n:>2}) Spoof {}\n", class.label()));
        n += 1;
    }
    let tail = ["Back up current values", "Restore from backup", "Verify", "Write diagnostic log"];
    for label in tail {
        out.push_str(&format!("{n:>2}) {label}\n"));
        n += 1;
    }
    out.push_str(" 0) Exit\n");
    out
}

/// Loop until the user exits or input ends. Command failures are printed and
/// the loop continues.
pub fn run_menu(ctx: &AppContext, input: &mut dyn BufRead) -> Result<()> {
    loop {
        print!("{}> ", menu_text(ctx.privilege.is_elevated()));
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if input.read_line(&mut line).context("Failed to read menu choice")? == 0 {
            println!();
            return Ok(());
        }
        let Some(choice) = parse_choice(&line) else {
            println!("Unknown option: {}", line.trim());
            continue;
        };

        let outcome = match choice {
            MenuChoice::Exit => return Ok(()),
            MenuChoice::Show => show_command(ctx),
            MenuChoice::Spoof(scope) => spoof_command(ctx, scope, input),
            MenuChoice::Backup => backup_command(ctx),
            MenuChoice::Restore => restore_command(ctx, input),
            MenuChoice::Verify => verify_command(ctx),
            MenuChoice::Diagnostics => diagnostics_command(ctx),
        };
        if let Err(err) = outcome {
            println!("Error: {err:#}");
        }
    }
}
