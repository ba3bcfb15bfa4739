//! Application configuration loading and validation.

use anyhow::{Context, Result};
use lib_measure::EngineSettings;
use lib_types::ModelCatalog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Measurement engine settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Open/short/load standard sweeps.
    #[serde(default)]
    pub calibration: Option<CalibrationFiles>,

    /// Analyzer model identifier, e.g. `AA-55 ZOOM`.
    #[serde(default)]
    pub model: Option<String>,
}

/// Sweep files holding the three calibration standards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibrationFiles {
    pub open: PathBuf,
    pub short: PathBuf,
    pub load: PathBuf,
}

impl CalibrationFiles {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Path)> {
        [
            ("open", self.open.as_path()),
            ("short", self.short.as_path()),
            ("load", self.load.as_path()),
        ]
        .into_iter()
    }
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content)?
    } else {
        // Assume TOML
        toml::from_str(&content)
            .with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Load the given file or fall back to defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading configuration from {:?}", p);
            load_config(p)
        }
        None => Ok(AppConfig::default()),
    }
}

/// Validate configuration.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    config
        .engine
        .validate()
        .context("Invalid engine settings")?;

    if let Some(cal) = &config.calibration {
        for (label, path) in cal.iter() {
            if !path.exists() {
                anyhow::bail!("Calibration {} file not found: {:?}", label, path);
            }
        }
    }

    if let Some(model) = &config.model {
        if ModelCatalog::builtin().get(model).is_none() {
            anyhow::bail!("Unknown analyzer model: {}", model);
        }
    }

    Ok(())
}
