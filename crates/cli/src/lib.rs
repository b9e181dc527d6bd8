use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod commands;
pub mod menu;
pub mod platform;
pub mod render;

pub use commands::*;

/// Canonicalize the root path if possible, falling back to the given string
/// relative to the current working directory.
pub fn canonicalize_or_current(root: &str) -> Result<PathBuf> {
    let path = Path::new(root);
    if path == Path::new(".") {
        Ok(env::current_dir().context("Failed to get current directory")?)
    } else {
        match path.canonicalize() {
            Ok(p) => Ok(p),
            Err(_) => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(path))
            }
        }
    }
}

/// Directory holding the running executable; backups and logs live next to it.
pub fn executable_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("Failed to locate the running executable")?;
    Ok(exe.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")))
}

/// Ask a yes/no question on stdout and read the answer from `input`.
///
/// Only `y`/`yes` (any case) approve. End of input declines.
pub fn confirm(prompt: &str, input: &mut dyn BufRead) -> Result<bool> {
    print!("{prompt} [y/N]: ");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read confirmation")?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
