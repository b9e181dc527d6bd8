use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use hwid_core::{
    load_config, Catalog, EngineConfig, EngineLayout, IdentifierClass, Privilege, SnapshotStore,
    Sources,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::platform::Platform;
use crate::{canonicalize_or_current, executable_dir};

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Directory holding config, backup and logs. Defaults to the executable's directory.
    pub root: Option<String>,
    pub config: Option<String>,
    /// Operate on a simulated machine fixture instead of the host.
    pub simulate: Option<String>,
    /// Seed for reproducible values.
    pub seed: Option<u64>,
    /// Answer yes to confirmation prompts.
    pub yes: bool,
    pub json: bool,
}

/// Everything a command needs, built once at startup.
pub struct AppContext {
    pub layout: EngineLayout,
    pub config: EngineConfig,
    pub platform: Platform,
    pub catalog: Catalog,
    /// Probed once; mutating commands refuse to run without it.
    pub privilege: Privilege,
    pub snapshots: SnapshotStore,
    pub assume_yes: bool,
    pub json: bool,
    rng: RefCell<StdRng>,
}

impl AppContext {
    pub fn open(options: &GlobalOptions) -> Result<Self> {
        let root = match &options.root {
            Some(root) => canonicalize_or_current(root)?,
            None => executable_dir()?,
        };
        let config_path = options
            .config
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| EngineLayout::new(&root).config_path);
        let config = load_config(&config_path)
            .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
        let layout = EngineLayout::with_config(&root, &config);

        let platform = match &options.simulate {
            Some(path) => Platform::simulated(Path::new(path))?,
            None => Platform::native()?,
        };
        let privilege = Privilege::from_elevated(platform.is_elevated());
        if privilege.is_elevated() {
            info!(root = %layout.root.display(), simulated = platform.is_simulated(), "engine ready");
        } else {
            warn!("not running as Administrator; spoof and restore are disabled");
        }

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            catalog: Catalog::standard(&config),
            snapshots: SnapshotStore::from_layout(&layout),
            layout,
            config,
            platform,
            privilege,
            assume_yes: options.yes,
            json: options.json,
            rng: RefCell::new(rng),
        })
    }

    pub fn sources(&self) -> Sources<'_> {
        self.platform.sources()
    }

    /// Run `f` with the context's random source.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut self.rng.borrow_mut())
    }
}

/// Parse a class slug given on the command line.
pub fn parse_class(value: &str) -> Result<IdentifierClass> {
    IdentifierClass::from_slug(value).ok_or_else(|| {
        let allowed: Vec<&str> = IdentifierClass::ALL.iter().map(|c| c.slug()).collect();
        anyhow!("Invalid identifier class '{}'. Allowed: {}", value, allowed.join(", "))
    })
}
