use std::path::Path;

use anyhow::{Context, Result, bail};
use figment::{Figment, providers::Env};
use tracing::{debug, info};

use super::{Config, RawConfig, smart_load, validate};

/// Environment variables with this prefix override config file values.
/// `__` separates nested keys: `STATUSMAIL_SMTP__PASSWORD` sets `smtp.password`.
pub const ENV_PREFIX: &str = "STATUSMAIL_";

/// Read the config file and environment overrides without validating.
pub fn load_raw(path: &Path) -> Result<RawConfig> {
    if !path.is_file() {
        bail!("Config file not found: {}", path.display());
    }

    let figment = Figment::new()
        .merge(smart_load::auto(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    figment
        .extract()
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load, validate and default the config at `path`.
pub fn load(path: &Path) -> Result<Config> {
    info!("Loading config from {}", path.display());

    let raw = load_raw(path)?;
    let config = validate(raw)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    match serde_yml::to_string(&config) {
        Ok(dump) => debug!("Loaded config:\n{dump}"),
        Err(e) => debug!("Loaded config (not printable: {e})"),
    }

    Ok(config)
}
