//! Logging system initialization
//!
//! Uses the tracing ecosystem for structured logging with support for:
//! - Environment variable override (TASKPOOL_LOG)
//! - File output with daily rotation
//! - Console output for development
//! - Module-level log filtering

use std::path::PathBuf;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// Get the default log directory path
fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskpool")
        .join("logs")
}

/// Initialize the logging system
///
/// # Environment Variables
/// - `TASKPOOL_LOG`: Override log level (e.g., "taskpool=debug")
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_env("TASKPOOL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("taskpool={}", config.level.to_lowercase())));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(config.file_line)
        .with_line_number(config.file_line)
        .with_ansi(true);

    let console_layer = if config.timestamps {
        console_layer.boxed()
    } else {
        console_layer.without_time().boxed()
    };

    let file_layer = if config.file_output {
        let log_dir = config.file_path.clone().unwrap_or_else(default_log_dir);

        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Warning: Failed to create log directory {:?}: {}", log_dir, e);
            None
        } else {
            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, &log_dir, "taskpool.log");

            let file_layer = fmt::layer()
                .with_writer(file_appender)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE);

            Some(file_layer.boxed())
        }
    } else {
        None
    };

    // a second init (tests, embedding apps with their own subscriber) is a
    // quiet no-op
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    tracing::debug!(
        level = %config.level,
        file_output = config.file_output,
        "logging configured"
    );
}

/// Parse log level from string
#[must_use]
pub fn parse_level(s: &str) -> Level {
    match s.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
