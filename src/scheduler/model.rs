//! Task Model
//!
//! Core data structures for background task scheduling.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};

/// Scheduling priority of a task
///
/// Only the initial admission order of a batch is derived from this; once a
/// task is admitted it is never preempted by a higher-priority one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl TaskPriority {
    /// Integer weight used for ordering; higher weight is admitted first.
    #[must_use]
    pub fn weight(self) -> u8 {
        match self {
            TaskPriority::Urgent => 4,
            TaskPriority::High => 3,
            TaskPriority::Normal => 2,
            TaskPriority::Low => 1,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Normal => write!(f, "normal"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Urgent => write!(f, "urgent"),
        }
    }
}

/// Lifecycle status of an execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Registered, not yet run
    #[default]
    Idle,
    /// Currently running (including waits between retry attempts)
    Running,
    /// Declared for parity with the controller's advisory pause flag; the
    /// engine never produces it
    Paused,
    /// Finished successfully
    Completed,
    /// Retry budget exhausted
    Error,
}

impl ExecutionStatus {
    /// Check if the status is terminal
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Error)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Idle => write!(f, "idle"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Paused => write!(f, "paused"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Error => write!(f, "error"),
        }
    }
}

/// Boxed future produced by a task's execute capability
pub type TaskFuture = BoxFuture<'static, TaskResult<Value>>;

/// Caller-supplied unit of work
pub type ExecuteFn = Arc<dyn Fn(TaskContext) -> TaskFuture + Send + Sync>;

/// Progress observer, invoked with values in 0..=100
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Completion observer, invoked with the task's result payload
pub type CompleteFn = Arc<dyn Fn(&Value) + Send + Sync>;

/// Failure observer, invoked once the retry budget is exhausted
pub type ErrorFn = Arc<dyn Fn(&TaskError) + Send + Sync>;

/// A registered unit of background work
///
/// Built with [`Task::new`] and the `with_*` builder methods. Absence of an
/// execute capability is not validated at registration; it surfaces as an
/// execution failure when a run is attempted.
#[derive(Clone)]
pub struct Task {
    /// Unique identifier; re-adding the same id overwrites the prior
    /// definition and resets its execution record
    pub id: String,
    /// Human-readable task name
    pub name: String,
    /// Display metadata, no scheduling effect
    pub description: Option<String>,
    /// Per-task override of the scheduler-wide default priority
    pub priority: Option<TaskPriority>,
    /// The unit of work itself
    pub execute: Option<ExecuteFn>,
    /// Opaque payload forwarded into the execution context
    pub data: Option<Value>,
    /// Declared dependencies; informational only, never consulted for
    /// admission ordering
    pub dependencies: Vec<String>,
    /// Per-task timeout override
    pub timeout: Option<Duration>,
    /// Per-task retry budget override
    pub retries: Option<u32>,
    /// Progress observer
    pub on_progress: Option<ProgressFn>,
    /// Completion observer
    pub on_complete: Option<CompleteFn>,
    /// Failure observer
    pub on_error: Option<ErrorFn>,
}

impl Task {
    /// Create a new task with the given id and display name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            priority: None,
            execute: None,
            data: None,
            dependencies: Vec::new(),
            timeout: None,
            retries: None,
            on_progress: None,
            on_complete: None,
            on_error: None,
        }
    }

    /// Builder: set the unit of work
    pub fn with_execute<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult<Value>> + Send + 'static,
    {
        self.execute = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    /// Builder: set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: set the priority
    #[must_use]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Builder: set the opaque payload
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Builder: declare dependencies (informational)
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Builder: set the timeout override
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder: set the retry budget override
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Builder: set the progress observer
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Builder: set the completion observer
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// Builder: set the failure observer
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&TaskError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("has_execute", &self.execute.is_some())
            .finish()
    }
}

/// Context handed to a task's execute capability
///
/// Carries the task id, the registered payload, a cancellation token the
/// engine triggers on timeout, and a progress reporter.
#[derive(Clone)]
pub struct TaskContext {
    /// Id of the task being run
    pub task_id: String,
    /// Cloned payload from the task definition
    pub data: Option<Value>,
    /// Cancelled by the engine when the run's deadline elapses; honoring it
    /// is up to the task body
    pub cancel: CancellationToken,
    progress: ProgressFn,
}

impl TaskContext {
    pub(crate) fn new(
        task_id: String,
        data: Option<Value>,
        cancel: CancellationToken,
        progress: ProgressFn,
    ) -> Self {
        Self {
            task_id,
            data,
            cancel,
            progress,
        }
    }

    /// Report progress for the current attempt; values are clamped to 100.
    pub fn report_progress(&self, percent: u8) {
        (self.progress)(percent.min(100));
    }

    /// Check whether the engine has cancelled this run
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task_id", &self.task_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Live run-record of one task, one-to-one with a registered [`Task`]
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    /// Record identifier, distinct from the task id
    pub id: Uuid,
    /// Back-reference to the task
    pub task_id: String,
    /// Current lifecycle status
    pub status: ExecutionStatus,
    /// Progress of the current attempt, 0..=100
    pub progress: u8,
    /// Stamped when the run starts; retries keep the original stamp
    pub start_time: Option<DateTime<Utc>>,
    /// Stamped when the run reaches a terminal status
    pub end_time: Option<DateTime<Utc>>,
    /// Result payload of a completed run
    pub result: Option<Value>,
    /// Message of the failure that exhausted the retry budget
    pub error: Option<String>,
    /// Number of completed retry attempts
    pub retry_count: u32,
}

impl Execution {
    /// Create a fresh idle record for the given task
    #[must_use]
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.into(),
            status: ExecutionStatus::Idle,
            progress: 0,
            start_time: None,
            end_time: None,
            result: None,
            error: None,
            retry_count: 0,
        }
    }

    /// Wall-clock duration of the run in milliseconds, once both milestones
    /// are stamped
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                let duration = end.signed_duration_since(start);
                Some(duration.num_milliseconds().max(0) as u64)
            }
            _ => None,
        }
    }
}

/// Process-wide scheduler counters
///
/// Zeroed at scheduler creation, mutated only by the engine and controller,
/// never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerState {
    /// Set by `start()`, cleared by `stop()`
    pub is_running: bool,
    /// Advisory flag toggled by `pause()`/`resume()`; the engine does not
    /// consult it
    pub is_paused: bool,
    /// Unfinished entries in the pending queue
    pub queue_size: usize,
    /// Runs currently in flight
    pub active_tasks_count: usize,
    /// Runs that reached `completed`
    pub completed_tasks_count: usize,
    /// Runs that exhausted their retry budget
    pub failed_tasks_count: usize,
    /// Stamp of the most recent successful completion
    pub last_task_execution_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_weights() {
        assert_eq!(TaskPriority::Urgent.weight(), 4);
        assert_eq!(TaskPriority::High.weight(), 3);
        assert_eq!(TaskPriority::Normal.weight(), 2);
        assert_eq!(TaskPriority::Low.weight(), 1);
        assert_eq!(TaskPriority::default(), TaskPriority::Normal);
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new("refresh", "Refresh data")
            .with_description("refetch everything")
            .with_priority(TaskPriority::High)
            .with_timeout(Duration::from_millis(500))
            .with_retries(2)
            .with_dependencies(vec!["warmup".to_string()])
            .with_execute(|_ctx| async { Ok(Value::Null) });

        assert_eq!(task.id, "refresh");
        assert_eq!(task.priority, Some(TaskPriority::High));
        assert_eq!(task.timeout, Some(Duration::from_millis(500)));
        assert_eq!(task.retries, Some(2));
        assert_eq!(task.dependencies, vec!["warmup"]);
        assert!(task.execute.is_some());
    }

    #[test]
    fn test_task_without_execute() {
        let task = Task::new("empty", "No body");
        assert!(task.execute.is_none());
    }

    #[test]
    fn test_fresh_execution_record() {
        let exec = Execution::new("refresh");
        assert_eq!(exec.task_id, "refresh");
        assert_eq!(exec.status, ExecutionStatus::Idle);
        assert_eq!(exec.progress, 0);
        assert_eq!(exec.retry_count, 0);
        assert!(exec.start_time.is_none());
        assert!(exec.duration_ms().is_none());
    }

    #[test]
    fn test_status_checks() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Error.is_terminal());
        assert!(!ExecutionStatus::Idle.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ExecutionStatus::Idle.to_string(), "idle");
        assert_eq!(ExecutionStatus::Error.to_string(), "error");
        assert_eq!(TaskPriority::Urgent.to_string(), "urgent");
    }

    #[test]
    fn test_priority_serde_lowercase() {
        let p: TaskPriority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(p, TaskPriority::Urgent);
        assert_eq!(serde_json::to_string(&TaskPriority::Low).unwrap(), "\"low\"");
    }
}
