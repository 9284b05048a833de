//! Configuration
//!
//! Loading, parsing, and defaults for scheduler and logging settings:
//! 1. Embedded default_config.toml (compile-time defaults)
//! 2. Optional user config at <config dir>/taskpool/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::scheduler::TaskPriority;

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = include_str!("../default_config.toml");

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Compile-time defaults
    #[must_use]
    pub fn defaults() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load the user config from the platform config directory, falling
    /// back to the embedded defaults when no file exists.
    pub fn load() -> ConfigResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::defaults()),
        }
    }

    /// Load a config file from an explicit path
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Platform location of the user config file
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("taskpool").join("config.toml"))
    }
}

/// Scheduler settings, read once at scheduler construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on simultaneously in-flight executions
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Re-attempts after a failure before an execution becomes terminal
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-run deadline, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Priority applied to tasks registered without an override
    #[serde(default)]
    pub priority: TaskPriority,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            priority: TaskPriority::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Logging settings consumed by [`crate::logging::init_logging`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when TASKPOOL_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show timestamps on console output
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Show file and line numbers
    #[serde(default)]
    pub file_line: bool,
    /// Enable daily-rotated file output
    #[serde(default)]
    pub file_output: bool,
    /// Log file directory path
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: true,
            file_line: false,
            file_output: false,
            file_path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
