//! framewise configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. File named by the FRAMEWISE_CONFIG environment variable
//! 3. Project-level (./framewise.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use framewise::util::config::{load_config_str, RuntimeConfig};
//!
//! let config = load_config_str("[scheduler]\nenable_stats = true\n").unwrap();
//! assert!(config.scheduler.enable_stats);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::logger::LogLevel;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "FRAMEWISE_CONFIG";

/// Project-level config file name.
pub const CONFIG_FILE: &str = "framewise.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeConfig {
    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// Remaining delays at or below this many seconds count as elapsed.
    /// Absorbs float drift from subtracting frame deltas.
    #[serde(default = "default_delay_epsilon")]
    pub delay_epsilon: f32,
    /// Job slots reserved up front.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Collect [`StatsSnapshot`](crate::runtime::scheduler::StatsSnapshot) counters.
    #[serde(default)]
    pub enable_stats: bool,
}

fn default_delay_epsilon() -> f32 {
    1e-5
}

fn default_initial_capacity() -> usize {
    64
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delay_epsilon: 1e-5,
            initial_capacity: 64,
            enable_stats: false,
        }
    }
}

impl SchedulerConfig {
    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delay_epsilon.is_finite() || self.delay_epsilon < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scheduler.delay_epsilon must be a finite, non-negative number, got {}",
                self.delay_epsilon
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LogConfig {
    /// Minimum level printed
    #[serde(default)]
    pub level: LogLevel,
}

/// Get the config file path from the environment or the working directory
pub fn get_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    None
}

/// Parse configuration from TOML text
pub fn load_config_str(content: &str) -> Result<RuntimeConfig, ConfigError> {
    let config: RuntimeConfig = toml::from_str(content).map_err(ConfigError::ParseError)?;
    config.scheduler.validate()?;
    Ok(config)
}

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    load_config_str(&content)
}

/// Load configuration following the hierarchy above.
/// Returns default config if no file is found
pub fn load_default_config() -> Result<RuntimeConfig, ConfigError> {
    match get_config_path() {
        Some(path) => load_config(&path),
        None => Ok(RuntimeConfig::default()),
    }
}

/// Save configuration
pub fn save_config(
    path: &Path,
    config: &RuntimeConfig,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(ConfigError::IoError)?;
        }
    }

    let content = to_toml(config)?;
    fs::write(path, content).map_err(ConfigError::IoError)?;

    Ok(())
}

/// Render configuration as TOML
pub fn to_toml(config: &RuntimeConfig) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(ConfigError::SerializeError)
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(toml::de::Error),
    SerializeError(toml::ser::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Config serialize error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(e) => Some(e),
            ConfigError::SerializeError(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}
