//! Configuration – reads/writes `~/.vtel/config.toml`.

use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vtel_kernel::MAX_SPEED_KMH;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Validation rule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Upper bound for accepted speed samples, km/h.
    #[serde(default = "default_max_speed")]
    pub max_speed_kmh: f64,
}

/// Rejected-sample logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Maximum diagnostic log records per second; `0` disables the limit.
    #[serde(default = "default_diagnostics_per_second")]
    pub max_per_second: u32,
}

/// Feed replay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Delay between two replayed samples, milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Capacity of the async reading bus.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

/// Persisted configuration stored in `~/.vtel/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

fn default_max_speed() -> f64 {
    MAX_SPEED_KMH
}
fn default_diagnostics_per_second() -> u32 {
    10
}
fn default_interval_ms() -> u64 {
    100
}
fn default_bus_capacity() -> usize {
    256
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: default_max_speed(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_per_second: default_diagnostics_per_second(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl Config {
    /// Rate limit for the diagnostic sink, `None` when unlimited.
    pub fn diagnostics_limit(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.diagnostics.max_per_second)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.validation.max_speed_kmh;
        if !max.is_finite() || max <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "validation.max_speed_kmh must be a positive number, got {max}"
            )));
        }
        if self.replay.bus_capacity == 0 {
            return Err(ConfigError::Invalid(
                "replay.bus_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Return the path to `~/.vtel/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".vtel").join("config.toml")
}

/// Load the config at `path`, falling back to defaults when the file does
/// not exist.  Environment overrides are applied in both cases.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if it is missing.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(toml::from_str(&raw)?))
}

/// Apply `VTEL_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `VTEL_MAX_SPEED_KMH` | `validation.max_speed_kmh` |
/// | `VTEL_DIAGNOSTICS_PER_SECOND` | `diagnostics.max_per_second` |
/// | `VTEL_REPLAY_INTERVAL_MS` | `replay.interval_ms` |
/// | `VTEL_BUS_CAPACITY` | `replay.bus_capacity` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("VTEL_MAX_SPEED_KMH")
        && let Ok(max) = v.parse::<f64>()
    {
        cfg.validation.max_speed_kmh = max;
    }
    if let Ok(v) = std::env::var("VTEL_DIAGNOSTICS_PER_SECOND")
        && let Ok(n) = v.parse::<u32>()
    {
        cfg.diagnostics.max_per_second = n;
    }
    if let Ok(v) = std::env::var("VTEL_REPLAY_INTERVAL_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.replay.interval_ms = ms;
    }
    if let Ok(v) = std::env::var("VTEL_BUS_CAPACITY")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.replay.bus_capacity = n;
    }
}

/// Save the config to `path`, creating its directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    fs::write(path, raw).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
