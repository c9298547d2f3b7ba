//! Configuration loading for swara.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/swara/config.toml` (system)
//! 2. `~/.config/swara/config.toml` (user)
//! 3. `./swara.toml` (local override), or the path given with `--config`
//! 4. Environment variables (`SWARA_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [quantize]
//! voicing_threshold = 0.9
//! rest_majority = 0.8
//! rest_penalty = 0.51
//! min_predictions_per_note = 20
//! max_predictions_per_note = 64
//!
//! [search]
//! workers = 8
//! deadline_ms = 500
//!
//! [store]
//! artifact_dir = "~/.cache/swara/artifacts"
//! ttl_secs = 600
//! sweep_secs = 600
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};
pub use sections::{SearchConfig, StoreConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use swara::QuantizePolicy;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete swara configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SwaraConfig {
    #[serde(default)]
    pub quantize: QuantizePolicy,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl SwaraConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, with `config_path` replacing `./swara.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables were applied.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = SwaraConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::overlay_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject values the pipeline or the sweep task cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.quantize
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.search.workers == 0 {
            return Err(ConfigError::Invalid("search.workers must be at least 1".to_string()));
        }
        if self.store.ttl_secs == 0 {
            return Err(ConfigError::Invalid("store.ttl_secs must be at least 1".to_string()));
        }
        if self.store.sweep_secs == 0 {
            return Err(ConfigError::Invalid("store.sweep_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.search.deadline_ms.map(Duration::from_millis)
    }

    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.store.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.store.sweep_secs)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Built by hand to keep section order and comments stable
        let mut output = String::new();

        output.push_str("# swara configuration\n\n");

        let q = &self.quantize;
        output.push_str("[quantize]\n");
        output.push_str(&format!("voicing_threshold = {:?}\n", q.voicing_threshold));
        output.push_str(&format!("rest_majority = {:?}\n", q.rest_majority));
        output.push_str(&format!("rest_penalty = {:?}\n", q.rest_penalty));
        output.push_str(&format!(
            "min_predictions_per_note = {}\n",
            q.min_predictions_per_note
        ));
        output.push_str(&format!(
            "max_predictions_per_note = {}\n",
            q.max_predictions_per_note
        ));

        output.push_str("\n[search]\n");
        output.push_str(&format!("workers = {}\n", self.search.workers));
        match self.search.deadline_ms {
            Some(ms) => output.push_str(&format!("deadline_ms = {}\n", ms)),
            None => output.push_str("# deadline_ms = 500\n"),
        }

        output.push_str("\n[store]\n");
        output.push_str(&format!(
            "artifact_dir = {}\n",
            toml::Value::String(self.store.artifact_dir.display().to_string())
        ));
        output.push_str(&format!("ttl_secs = {}\n", self.store.ttl_secs));
        output.push_str(&format!("sweep_secs = {}\n", self.store.sweep_secs));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            toml::Value::String(self.telemetry.log_level.clone())
        ));

        output
    }
}
