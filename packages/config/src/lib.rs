#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Application configuration.
//!
//! Defaults live in `default.toml`, compiled into the binary. An optional
//! file named by `ROAD_HAZARD_CONFIG` is merged on top of them key by key,
//! and `ROAD_HAZARD_DATA_FILE` overrides the hazard data file last.

use std::path::{Path, PathBuf};

use road_hazard_analytics::MatchingConfig;
use road_hazard_announce::AnnounceConfig;
use road_hazard_motion::MotionConfig;
use road_hazard_navigation::NavigationConfig;
use road_hazard_prediction::PredictionConfig;
use road_hazard_verification::VerificationConfig;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming an override file.
pub const CONFIG_ENV: &str = "ROAD_HAZARD_CONFIG";

/// Environment variable overriding [`StoreConfig::data_file`].
pub const DATA_FILE_ENV: &str = "ROAD_HAZARD_DATA_FILE";

const DEFAULT_TOML: &str = include_str!("../default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The override file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A document was not valid TOML.
    #[error("Invalid TOML: {0}")]
    Syntax(#[from] toml::de::Error),
    /// The merged document did not match the expected shape.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Hazard persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file backing the primary store.
    pub data_file: PathBuf,
    /// Id prefix for reports created while running on the in-memory
    /// fallback.
    pub fallback_id_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/hazards.json"),
            fallback_id_prefix: "local_".to_string(),
        }
    }
}

/// Every tunable of the system, one section per component.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub motion: MotionConfig,
    pub matching: MatchingConfig,
    pub prediction: PredictionConfig,
    pub verification: VerificationConfig,
    pub announce: AnnounceConfig,
    pub navigation: NavigationConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// The built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded defaults do not parse.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_layers(&[DEFAULT_TOML])
    }

    /// Built-in defaults with `overrides` merged on top.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either document is invalid.
    pub fn from_toml_str(overrides: &str) -> Result<Self, ConfigError> {
        Self::from_layers(&[DEFAULT_TOML, overrides])
    }

    /// Built-in defaults, then the file at `path` if given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::embedded();
        };
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading configuration overrides from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Loads configuration the way the binaries do, honoring
    /// `ROAD_HAZARD_CONFIG` and `ROAD_HAZARD_DATA_FILE`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the override file cannot be read or is
    /// invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = Self::load_from(path.as_deref())?;
        if let Some(data_file) = std::env::var_os(DATA_FILE_ENV) {
            config.store.data_file = PathBuf::from(data_file);
        }
        Ok(config)
    }

    fn from_layers(layers: &[&str]) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();
        for layer in layers {
            merge(&mut merged, layer.parse::<toml::Table>()?);
        }
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Invalid {
                message: e.to_string(),
            })
    }
}

/// Recursively overlays `overlay` onto `base`. Tables merge, everything
/// else is replaced.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
