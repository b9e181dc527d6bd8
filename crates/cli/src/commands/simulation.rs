use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use hwid_core::sources::fixture::MachineFixture;

/// Write the sample simulated machine to `path`.
pub fn init_simulation_command(path: &str, force: bool) -> Result<()> {
    let path = Path::new(path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&MachineFixture::sample())?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write simulation fixture: {}", path.display()))?;
    println!("Simulated machine written to {}", path.display());
    Ok(())
}
