//! Configuration schema for koji-lineage
//!
//! Configuration is stored at `~/.config/koji-lineage/config.toml`

use crate::cache::{
    CacheStore, DEFAULT_BUILD_DATA_CAPACITY, DEFAULT_INDEX_CAPACITY,
    DEFAULT_TASK_RESULTS_CAPACITY, DEFAULT_TTL_SECS, MAX_TTL_SECS,
};
use crate::index::IndexSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache sizes, lifetime and location
    pub cache: CacheConfig,

    /// Build metadata source
    pub source: SourceConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for persisted caches (default: per-user cache dir)
    pub dir: Option<PathBuf>,

    /// Maximum cached build records
    pub build_data_capacity: usize,

    /// Maximum cached task results
    pub task_results_capacity: usize,

    /// Maximum entries in each identity index
    pub index_capacity: usize,

    /// Seconds before build records and task results are re-fetched
    pub ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            build_data_capacity: DEFAULT_BUILD_DATA_CAPACITY,
            task_results_capacity: DEFAULT_TASK_RESULTS_CAPACITY,
            index_capacity: DEFAULT_INDEX_CAPACITY,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Resolved cache directory
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(CacheStore::default_dir)
    }

    /// Check bounds that deserialization alone cannot enforce
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_TTL_SECS).contains(&self.ttl_secs) {
            return Err(format!(
                "cache.ttl_secs must be between 1 and {}, got {}",
                MAX_TTL_SECS, self.ttl_secs
            ));
        }
        let capacities = [
            ("build_data_capacity", self.build_data_capacity),
            ("task_results_capacity", self.task_results_capacity),
            ("index_capacity", self.index_capacity),
        ];
        for (name, capacity) in capacities {
            if capacity == 0 {
                return Err(format!("cache.{} must be at least 1", name));
            }
        }
        Ok(())
    }

    /// Settings for a fresh index set
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            build_data_capacity: self.build_data_capacity,
            task_results_capacity: self.task_results_capacity,
            index_capacity: self.index_capacity,
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Build metadata source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON export of build metadata to serve lookups from
    pub snapshot: Option<PathBuf>,
}
