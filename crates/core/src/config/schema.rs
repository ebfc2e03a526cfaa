//! Configuration schema definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    /// User store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Proximity search defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Live refresh settings
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Location migration settings
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConfigSchema {
    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if !(search.max_radius_km.is_finite() && search.max_radius_km > 0.0) {
            return Err(Error::invalid_config(format!(
                "search.max_radius_km must be a positive number, got {}",
                search.max_radius_km
            )));
        }
        if !(search.default_radius_km.is_finite() && search.default_radius_km > 0.0) {
            return Err(Error::invalid_config(format!(
                "search.default_radius_km must be a positive number, got {}",
                search.default_radius_km
            )));
        }
        if search.default_radius_km > search.max_radius_km {
            return Err(Error::invalid_config(format!(
                "search.default_radius_km ({}) exceeds search.max_radius_km ({})",
                search.default_radius_km, search.max_radius_km
            )));
        }
        if self.refresh.interval_secs == 0 {
            return Err(Error::invalid_config("refresh.interval_secs must be at least 1"));
        }
        Ok(())
    }
}

/// User store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON document store
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("users.json")
}

/// Proximity search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Radius used when none is given
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,

    /// Largest radius accepted from users
    #[serde(default = "default_max_radius_km")]
    pub max_radius_km: f64,

    /// Sort mode used when none is given (distance-asc, distance-desc, name-asc, name-desc)
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
            max_radius_km: default_max_radius_km(),
            default_sort: default_sort(),
        }
    }
}

fn default_radius_km() -> f64 {
    5.0
}

fn default_max_radius_km() -> f64 {
    100.0
}

fn default_sort() -> String {
    "distance-asc".to_string()
}

/// Live refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between refresh ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3
}

/// Location migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Build the spherical index after a successful migration
    #[serde(default = "default_true")]
    pub ensure_index: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { ensure_index: true }
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
