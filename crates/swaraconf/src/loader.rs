//! Config file discovery, TOML overlay, and environment variable overrides.

use crate::{ConfigError, SwaraConfig};
use std::env;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// A CLI path replaces `./swara.toml`. It is returned even when missing so
/// that loading reports it instead of silently falling back.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/swara/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(dirs) = directories::BaseDirs::new() {
        let user = dirs.config_dir().join("swara/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    match cli_path {
        Some(path) => files.push(path.to_path_buf()),
        None => {
            let local = PathBuf::from("swara.toml");
            if local.exists() {
                files.push(local);
            }
        }
    }

    files
}

/// Read `path` and overlay the keys it sets onto `config`.
pub fn overlay_file(config: &mut SwaraConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    overlay_toml(config, &contents, path)
}

/// Overlay the keys present in a TOML document onto `config`.
///
/// Keys the document leaves out keep their current value, so files can be
/// stacked. Unknown keys are ignored; known keys of the wrong type are not.
pub fn overlay_toml(config: &mut SwaraConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(quantize) = Section::find(&table, "quantize", path)? {
        let policy = &mut config.quantize;
        if let Some(v) = quantize.float("voicing_threshold")? {
            policy.voicing_threshold = v;
        }
        if let Some(v) = quantize.float("rest_majority")? {
            policy.rest_majority = v;
        }
        if let Some(v) = quantize.float("rest_penalty")? {
            policy.rest_penalty = v;
        }
        if let Some(v) = quantize.unsigned("min_predictions_per_note")? {
            policy.min_predictions_per_note = v as usize;
        }
        if let Some(v) = quantize.unsigned("max_predictions_per_note")? {
            policy.max_predictions_per_note = v as usize;
        }
    }

    if let Some(search) = Section::find(&table, "search", path)? {
        if let Some(v) = search.unsigned("workers")? {
            config.search.workers = v as usize;
        }
        if let Some(v) = search.unsigned("deadline_ms")? {
            config.search.deadline_ms = Some(v);
        }
    }

    if let Some(store) = Section::find(&table, "store", path)? {
        if let Some(v) = store.string("artifact_dir")? {
            config.store.artifact_dir = expand_path(v);
        }
        if let Some(v) = store.unsigned("ttl_secs")? {
            config.store.ttl_secs = v;
        }
        if let Some(v) = store.unsigned("sweep_secs")? {
            config.store.sweep_secs = v;
        }
    }

    if let Some(telemetry) = Section::find(&table, "telemetry", path)? {
        if let Some(v) = telemetry.string("log_level")? {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

/// One `[section]` of a config document, with typed key access.
struct Section<'a> {
    name: &'static str,
    table: &'a Table,
    path: &'a Path,
}

impl<'a> Section<'a> {
    fn find(table: &'a Table, name: &'static str, path: &'a Path) -> Result<Option<Self>, ConfigError> {
        match table.get(name) {
            None => Ok(None),
            Some(Value::Table(table)) => Ok(Some(Self { name, table, path })),
            Some(other) => Err(ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("[{}] must be a table, got {}", name, other.type_str()),
            }),
        }
    }

    fn float(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.table.get(key) {
            None => Ok(None),
            Some(Value::Float(v)) => Ok(Some(*v)),
            Some(Value::Integer(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(self.wrong_type(key, "a number", other)),
        }
    }

    fn unsigned(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.table.get(key) {
            None => Ok(None),
            Some(Value::Integer(v)) if *v >= 0 => Ok(Some(*v as u64)),
            Some(other) => Err(self.wrong_type(key, "a non-negative integer", other)),
        }
    }

    fn string(&self, key: &str) -> Result<Option<&'a str>, ConfigError> {
        match self.table.get(key) {
            None => Ok(None),
            Some(Value::String(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(self.wrong_type(key, "a string", other)),
        }
    }

    fn wrong_type(&self, key: &str, expected: &str, got: &Value) -> ConfigError {
        ConfigError::Parse {
            path: self.path.to_path_buf(),
            message: format!("{}.{} must be {}, got {}", self.name, key, expected, got),
        }
    }
}

/// Apply `SWARA_*` environment overrides to config.
pub fn apply_env_overrides(config: &mut SwaraConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from any key lookup. Values that fail to parse are skipped.
pub fn apply_overrides_from<F>(config: &mut SwaraConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("SWARA_VOICING_THRESHOLD").and_then(|v| v.parse().ok()) {
        config.quantize.voicing_threshold = v;
        sources.env_overrides.push("SWARA_VOICING_THRESHOLD".to_string());
    }
    if let Some(v) = lookup("SWARA_WORKERS").and_then(|v| v.parse().ok()) {
        config.search.workers = v;
        sources.env_overrides.push("SWARA_WORKERS".to_string());
    }
    if let Some(v) = lookup("SWARA_DEADLINE_MS").and_then(|v| v.parse().ok()) {
        config.search.deadline_ms = Some(v);
        sources.env_overrides.push("SWARA_DEADLINE_MS".to_string());
    }
    if let Some(v) = lookup("SWARA_ARTIFACT_TTL_SECS").and_then(|v| v.parse().ok()) {
        config.store.ttl_secs = v;
        sources.env_overrides.push("SWARA_ARTIFACT_TTL_SECS".to_string());
    }

    if let Some(v) = lookup("SWARA_ARTIFACT_DIR") {
        config.store.artifact_dir = expand_path(&v);
        sources.env_overrides.push("SWARA_ARTIFACT_DIR".to_string());
    }
    if let Some(v) = lookup("SWARA_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("SWARA_LOG_LEVEL".to_string());
    }
    // RUST_LOG wins over SWARA_LOG_LEVEL
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand a leading `~/` or `$VAR/` in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        return match directories::BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(rest),
            None => PathBuf::from(path),
        };
    }

    if let Some(var_path) = path.strip_prefix('$') {
        let (name, rest) = var_path.split_once('/').unwrap_or((var_path, ""));
        if let Ok(value) = env::var(name) {
            let base = PathBuf::from(value);
            return if rest.is_empty() { base } else { base.join(rest) };
        }
    }

    PathBuf::from(path)
}
