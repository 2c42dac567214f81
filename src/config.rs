//! Platform configuration: API key plus the list of monitors to track.
//!
//! Loaded from YAML. `monitors` accepts either a single mapping or a list,
//! and the API key can be supplied through `HETRIXTOOLS_API_KEY` instead of
//! the file.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `api_key` when set.
pub const API_KEY_ENV: &str = "HETRIXTOOLS_API_KEY";

/// Default polling interval (one minute).
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("api_key must not be empty")]
    EmptyApiKey,

    #[error("at least one monitor is required")]
    NoMonitors,

    #[error("monitor #{index} has an empty id")]
    EmptyMonitorId { index: usize },

    #[error("monitor id {0:?} is configured more than once")]
    DuplicateMonitorId(String),

    #[error("scan_interval_secs must be greater than zero")]
    ZeroScanInterval,
}

/// One monitor entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(deserialize_with = "one_or_many")]
    pub monitors: Vec<MonitorConfig>,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<MonitorConfig>),
    One(MonitorConfig),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<MonitorConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(monitors) => monitors,
        OneOrMany::One(monitor) => vec![monitor],
    })
}

impl PlatformConfig {
    /// Default config location: `<config dir>/hetrixtools/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hetrixtools").join("config.yaml"))
    }

    /// Parse YAML without consulting the environment. Does not validate.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read, apply the environment override, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&text)?;
        config.apply_env_override(std::env::var(API_KEY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace the API key with `value` when it is present and non-blank.
    pub fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            self.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if self.monitors.is_empty() {
            return Err(ConfigError::NoMonitors);
        }

        let mut seen = HashSet::new();
        for (index, monitor) in self.monitors.iter().enumerate() {
            if monitor.id.trim().is_empty() {
                return Err(ConfigError::EmptyMonitorId { index });
            }
            if !seen.insert(monitor.id.as_str()) {
                return Err(ConfigError::DuplicateMonitorId(monitor.id.clone()));
            }
        }

        if self.scan_interval_secs == 0 {
            return Err(ConfigError::ZeroScanInterval);
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}
