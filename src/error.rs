//! Error Types
//!
//! Centralized error handling using thiserror for type-safe errors.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures produced while running a task's unit of work
///
/// Both variants of run failure (a body error and a synthesized timeout) pass
/// through the retry budget before becoming terminal; they never propagate
/// out of the scheduler as errors. Callers observe them through the
/// execution record and the `on_error` callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The deadline elapsed before the unit of work resolved
    #[error("Task timeout")]
    Timeout,

    /// The task body reported a failure
    #[error("{0}")]
    Failed(String),

    /// The task was registered without an execute capability
    #[error("Task '{id}' has no execute capability")]
    MissingExecute { id: String },
}

impl TaskError {
    /// Build a body failure from any displayable message
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Result type alias for a task body's outcome
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
