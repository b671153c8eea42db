//! Configuration module for Falcony
//!
//! Handles loading and validating settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load settings from an explicit path, or search the default locations.
///
/// Order: `explicit`, `$FALCONY_SETTINGS_PATH`, `falcony.yml`,
/// `config/falcony.yml`, `<config dir>/falcony/settings.yml`, then defaults.
/// Environment overrides are merged last in every case.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        info!("Loading settings from: {}", path.display());
        return finish(Settings::from_file(path)?);
    }

    // Check environment variable first
    if let Ok(path) = std::env::var("FALCONY_SETTINGS_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Loading settings from: {}", path.display());
            return finish(Settings::from_file(&path)?);
        }
    }

    let paths = [
        PathBuf::from("falcony.yml"),
        PathBuf::from("config/falcony.yml"),
        dirs::config_dir()
            .map(|p| p.join("falcony/settings.yml"))
            .unwrap_or_default(),
    ];

    for path in paths.iter() {
        if path.exists() {
            info!("Loading settings from: {}", path.display());
            return finish(Settings::from_file(path)?);
        }
    }

    info!("No settings file found, using defaults");
    finish(Settings::default())
}

fn finish(mut settings: Settings) -> Result<Settings> {
    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}
