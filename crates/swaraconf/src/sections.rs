//! Config sections other than the quantizer policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the grid search is run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Threads used for the exhaustive search.
    /// Default: available parallelism
    #[serde(default = "SearchConfig::default_workers")]
    pub workers: usize,

    /// Wall-clock budget in milliseconds. When set, the search runs on one
    /// thread and may return a best-so-far grid.
    /// Default: unbounded
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl SearchConfig {
    fn default_workers() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            deadline_ms: None,
        }
    }
}

/// Where exported note tables live and how long they are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory for exported CSV artifacts.
    /// Default: ~/.cache/swara/artifacts
    #[serde(default = "StoreConfig::default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Seconds an artifact stays retrievable.
    /// Default: 600
    #[serde(default = "StoreConfig::default_ttl_secs")]
    pub ttl_secs: u64,

    /// Seconds between sweeps of expired artifacts.
    /// Default: 600
    #[serde(default = "StoreConfig::default_sweep_secs")]
    pub sweep_secs: u64,
}

impl StoreConfig {
    fn default_artifact_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.cache_dir().join("swara/artifacts"))
            .unwrap_or_else(|| std::env::temp_dir().join("swara-artifacts"))
    }

    fn default_ttl_secs() -> u64 {
        600
    }

    fn default_sweep_secs() -> u64 {
        600
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            artifact_dir: Self::default_artifact_dir(),
            ttl_secs: Self::default_ttl_secs(),
            sweep_secs: Self::default_sweep_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
