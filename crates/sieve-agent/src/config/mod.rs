//! Configuration loading for Sieve.
//! Reads the file given by `--config` (or the SIEVE_CONFIG env var, resolved
//! by clap), else `sieve.toml` in the working directory, else the defaults.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use sieve_common::RunConfig;

pub const DEFAULT_CONFIG_FILE: &str = "sieve.toml";

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_paths: Vec<PathBuf>,
    pub stages: Vec<String>,
    pub multiprocess: bool,
    pub workers: Option<usize>,
}


/// Load from an explicit path, or from `sieve.toml` in `dir` when present.
/// An explicit path that does not exist is an error; a missing default file
/// gives the built-in defaults.
pub fn load_in(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<RunConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = dir.join(DEFAULT_CONFIG_FILE);
            if !path.exists() {
                debug!("No {} in {:?}; using defaults", DEFAULT_CONFIG_FILE, dir);
                return Ok(RunConfig::default());
            }
            path
        }
    };

    let config = RunConfig::from_toml_file(&path)
        .with_context(|| format!("Could not load {}", path.display()))?;
    info!(path = %path.display(), stages = config.stages.len(), "Configuration loaded");
    Ok(config)
}

pub fn load(explicit: Option<&Path>) -> anyhow::Result<RunConfig> {
    load_in(explicit, Path::new("."))
}

impl Overrides {
    pub fn apply(&self, config: &mut RunConfig) {
        if !self.base_paths.is_empty() {
            config.layout.base_paths = self.base_paths.clone();
        }
        if !self.stages.is_empty() {
            config.stages = self.stages.clone();
        }
        if self.multiprocess {
            config.docking.multiprocess = true;
        }
        if let Some(workers) = self.workers {
            config.docking.workers = workers;
        }
    }
}
