//! Engine configuration loading.
//!
//! Layers, each overriding the previous one:
//! 1. `EngineConfig::default()`
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `BLUEPRINT_` (e.g. `BLUEPRINT_MAX_STEPS=500`)

use std::path::Path;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};

use blueprint_runtime::EngineConfig;

pub const ENV_PREFIX: &str = "BLUEPRINT_";

pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
    let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

    if let Some(path) = path {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .context("Failed to load engine configuration")
}
