//! Taskpool
//!
//! In-memory background task scheduler for applications that need to run
//! work (data refreshes, long-running adapter actions, file operations)
//! without blocking their interactive surface:
//! - Named tasks with priority, timeout, and retry policy
//! - Bounded-concurrency batch execution with priority-ordered admission
//! - Live execution records and aggregate statistics for polling callers

pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;

pub use config::{AppConfig, LoggingConfig, SchedulerConfig};
pub use error::{ConfigError, SchedulerError, TaskError};
pub use scheduler::{
    Execution, ExecutionStatus, SchedulerState, SchedulerStats, Task, TaskContext, TaskPriority,
    TaskScheduler,
};
