use std::io;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use hwid_core::services::SpoofScope;
use hwid_core::IdentifierClass;
use hwid_spoofer::menu::run_menu;
use hwid_spoofer::{
    backup_command, diagnostics_command, init_simulation_command, parse_class, restore_command,
    show_command, spoof_command, verify_command, AppContext, GlobalOptions,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "hwid_core=info,hwid_spoofer=info";

/// Hardware identifier spoofer with backup, restore and verification.
///
/// All substantive logic lives in `hwid-core`; this binary parses flags,
/// builds the context and renders results.
#[derive(Parser, Debug)]
#[command(name = "hwid-spoofer", version, about = "Hardware identifier spoofer", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Directory holding the config, backup, journal and diagnostic logs.
    /// Defaults to the directory of the executable.
    #[arg(long, global = true)]
    root: Option<String>,

    /// Config file. Defaults to `<root>/hwid.json`.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Operate on a simulated machine fixture instead of this host.
    #[arg(long, global = true, value_name = "FIXTURE")]
    simulate: Option<String>,

    /// Seed the value generators for reproducible output.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Answer yes to every confirmation prompt.
    #[arg(long, short = 'y', global = true, default_value_t = false)]
    yes: bool,

    /// Emit JSON instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive numbered menu (the default).
    Menu,

    /// Show the current value of every identifier.
    Show,

    /// Spoof every identifier class.
    SpoofAll,

    /// Spoof a single identifier class.
    Spoof {
        /// One of: machine-guid, computer-name, firmware, network, storage, product.
        #[arg(value_parser = parse_class_arg)]
        class: IdentifierClass,
    },

    /// Capture all current values into the backup file.
    Backup,

    /// Restore the machine GUID and computer name from the backup.
    Restore,

    /// Compare current values against the backup and across sources.
    Verify,

    /// Write a read-only diagnostic log.
    Diagnostics,

    /// Write a sample simulated machine for use with `--simulate`.
    InitSimulation {
        /// Where to write the fixture.
        path: String,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn parse_class_arg(value: &str) -> Result<IdentifierClass, String> {
    parse_class(value).map_err(|err| err.to_string())
}

fn init_logging() {
    let filter = std::env::var("HWID_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let command = cli.command.unwrap_or(Command::Menu);
    if let Command::InitSimulation { path, force } = &command {
        return init_simulation_command(path, *force);
    }

    let options = GlobalOptions {
        root: cli.global.root,
        config: cli.global.config,
        simulate: cli.global.simulate,
        seed: cli.global.seed,
        yes: cli.global.yes,
        json: cli.global.json,
    };
    let ctx = AppContext::open(&options)?;
    let stdin = io::stdin();
    let mut input = stdin.lock();

    match command {
        Command::Menu => run_menu(&ctx, &mut input)?,
        Command::Show => show_command(&ctx)?,
        Command::SpoofAll => spoof_command(&ctx, SpoofScope::All, &mut input)?,
        Command::Spoof { class } => spoof_command(&ctx, SpoofScope::Single(class), &mut input)?,
        Command::Backup => backup_command(&ctx)?,
        Command::Restore => restore_command(&ctx, &mut input)?,
        Command::Verify => verify_command(&ctx)?,
        Command::Diagnostics => diagnostics_command(&ctx)?,
        Command::InitSimulation { .. } => {}
    }

    Ok(())
}
