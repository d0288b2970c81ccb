//! Run config resolution.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, the
//! environment (`OXLDUT_ENDPOINT`, via clap), command-line flags.

use std::path::{Path, PathBuf};

use drivercore_recon::config::{DelimitedLayout, MalformedPolicy};
use drivercore_recon::RunConfig;

use crate::exit_codes::EXIT_CONFIG;
use crate::CliError;

/// `<config_dir>/oxldut/config.toml`, e.g. `~/.config/oxldut/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("oxldut").join("config.toml"))
}

/// Command-line values that override the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub layout: Option<DelimitedLayout>,
    pub on_malformed: Option<MalformedPolicy>,
    pub retries: Option<u32>,
}

pub fn resolve(explicit: Option<&Path>, overrides: &Overrides) -> Result<RunConfig, CliError> {
    let mut config = match explicit {
        Some(path) => load(path)?,
        None => match default_config_path() {
            Some(path) if path.is_file() => {
                log::debug!("using config {}", path.display());
                load(&path)?
            }
            _ => RunConfig::default(),
        },
    };

    if let Some(endpoint) = &overrides.endpoint {
        config.catalog.endpoint = endpoint.clone();
    }
    if let Some(layout) = overrides.layout {
        config.ingest.layout = layout;
    }
    if let Some(policy) = overrides.on_malformed {
        config.ingest.on_malformed = policy;
    }
    if let Some(retries) = overrides.retries {
        config.retry.max_retries = retries;
    }

    config.validate().map_err(|e| {
        CliError::new(EXIT_CONFIG, e.to_string()).with_hint("check --endpoint or the config file")
    })?;
    Ok(config)
}

fn load(path: &Path) -> Result<RunConfig, CliError> {
    RunConfig::from_path(path).map_err(|e| {
        CliError::new(EXIT_CONFIG, format!("{}: {e}", path.display()))
    })
}
