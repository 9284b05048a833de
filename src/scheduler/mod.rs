//! Background Task Scheduling
//!
//! In-memory scheduler for background operations: a registry of named units
//! of work with priority, timeout, and retry policy, an execution engine
//! with bounded concurrency, a start/pause/resume/stop controller, and an
//! aggregate statistics view.

mod engine;
mod model;
mod registry;
mod stats;

pub use model::{
    CompleteFn, ErrorFn, ExecuteFn, Execution, ExecutionStatus, ProgressFn, SchedulerState, Task,
    TaskContext, TaskFuture, TaskPriority,
};
pub use stats::SchedulerStats;

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use registry::TaskRegistry;

/// In-memory background task scheduler
///
/// Exclusively owns the task table, the execution records, and the pending
/// queue; all access goes through its methods. Cloning is cheap and shares
/// the underlying state, so an embedding application can hand clones to its
/// interactive surface and its background runtime.
#[derive(Clone)]
pub struct TaskScheduler {
    config: SchedulerConfig,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    registry: TaskRegistry,
    state: SchedulerState,
}

impl Inner {
    fn publish_queue_size(&mut self) {
        self.state.queue_size = self.registry.queue_len();
    }
}

impl TaskScheduler {
    /// Create a scheduler with the given configuration
    ///
    /// The configuration is read once here; it is not hot-reloadable.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(
            max_concurrent = config.max_concurrent,
            max_retries = config.max_retries,
            timeout_ms = config.timeout_ms,
            "scheduler created"
        );
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Create a scheduler with default configuration
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(SchedulerConfig::default())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run a closure against the owned state; a poisoned lock degrades to
    /// `None` rather than panicking.
    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Option<T> {
        self.inner.lock().ok().map(|mut guard| f(&mut guard))
    }

    // ── Registry ─────────────────────────────────────────────────────

    /// Register a task; re-adding an existing id overwrites the definition
    /// and resets its execution record to idle.
    ///
    /// The execute capability is not validated here; a task registered
    /// without one fails when a run is attempted.
    pub fn add_task(&self, task: Task) {
        debug!(task_id = %task.id, name = %task.name, "task registered");
        self.with_inner(|inner| inner.registry.insert(task));
    }

    /// Remove a task and its execution record; a queued (pending) entry for
    /// it is dropped and will never be admitted.
    pub fn remove_task(&self, id: &str) -> Option<Task> {
        self.with_inner(|inner| {
            let removed = inner.registry.remove(id);
            inner.publish_queue_size();
            if removed.is_some() {
                debug!(task_id = %id, queue_size = inner.state.queue_size, "task removed");
            }
            removed
        })
        .flatten()
    }

    /// Drop every task, execution record, and queued entry, and reset the
    /// completion/failure counters.
    pub fn clear_tasks(&self) {
        self.with_inner(|inner| {
            inner.registry.clear();
            inner.state.completed_tasks_count = 0;
            inner.state.failed_tasks_count = 0;
            inner.publish_queue_size();
        });
        debug!("all tasks cleared");
    }

    /// Look up a task definition; absent ids simply yield `None`.
    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.with_inner(|inner| inner.registry.get(id).cloned())
            .flatten()
    }

    // ── Controller ───────────────────────────────────────────────────

    /// Mark the scheduler as running
    pub fn start(&self) {
        self.with_inner(|inner| {
            inner.state.is_running = true;
            inner.state.is_paused = false;
        });
        info!("scheduler started");
    }

    /// Raise the advisory pause flag; in-flight and newly requested
    /// executions are not held back by it.
    pub fn pause(&self) {
        self.with_inner(|inner| inner.state.is_paused = true);
        info!("scheduler paused");
    }

    /// Clear the advisory pause flag
    pub fn resume(&self) {
        self.with_inner(|inner| inner.state.is_paused = false);
        info!("scheduler resumed");
    }

    /// Stop the scheduler and empty the pending queue
    ///
    /// Queued tasks that were not yet admitted will never run; executions
    /// already in flight are not cancelled.
    pub fn stop(&self) {
        self.with_inner(|inner| {
            inner.state.is_running = false;
            inner.state.is_paused = false;
            inner.registry.clear_queue();
            inner.publish_queue_size();
        });
        info!("scheduler stopped");
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Execution record of a task, keyed by task id
    pub fn get_execution(&self, task_id: &str) -> Option<Execution> {
        self.with_inner(|inner| inner.registry.get_execution(task_id).cloned())
            .flatten()
    }

    /// Tasks whose execution record currently has the given status
    pub fn get_tasks_by_status(&self, status: ExecutionStatus) -> Vec<Task> {
        self.with_inner(|inner| inner.registry.tasks_by_status(status))
            .unwrap_or_default()
    }

    /// Tasks whose effective priority (override or scheduler default)
    /// matches
    pub fn get_tasks_by_priority(&self, priority: TaskPriority) -> Vec<Task> {
        let default = self.config.priority;
        self.with_inner(|inner| inner.registry.tasks_by_priority(priority, default))
            .unwrap_or_default()
    }

    /// Aggregate statistics over all current execution records
    pub fn stats(&self) -> SchedulerStats {
        self.with_inner(|inner| SchedulerStats::aggregate(&inner.registry))
            .unwrap_or_default()
    }

    /// Snapshot of the process-wide scheduler counters
    pub fn state(&self) -> SchedulerState {
        self.with_inner(|inner| inner.state.clone())
            .unwrap_or_default()
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (tasks, queued) = self
            .with_inner(|inner| (inner.registry.len(), inner.registry.queue_len()))
            .unwrap_or((0, 0));
        f.debug_struct("TaskScheduler")
            .field("tasks", &tasks)
            .field("queued", &queued)
            .field("max_concurrent", &self.config.max_concurrent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> TaskScheduler {
        TaskScheduler::with_defaults()
    }

    #[test]
    fn test_add_and_get_task() {
        let sched = scheduler();
        sched.add_task(Task::new("a", "A"));

        let task = sched.get_task("a").unwrap();
        assert_eq!(task.name, "A");
        assert!(sched.get_task("missing").is_none());

        let exec = sched.get_execution("a").unwrap();
        assert_eq!(exec.status, ExecutionStatus::Idle);
    }

    #[test]
    fn test_controller_flags() {
        let sched = scheduler();
        assert!(!sched.state().is_running);

        sched.start();
        assert!(sched.state().is_running);
        assert!(!sched.state().is_paused);

        sched.pause();
        assert!(sched.state().is_paused);

        sched.resume();
        assert!(!sched.state().is_paused);

        sched.stop();
        let state = sched.state();
        assert!(!state.is_running);
        assert!(!state.is_paused);
        assert_eq!(state.queue_size, 0);
    }

    #[test]
    fn test_clear_tasks_resets_counters() {
        let sched = scheduler();
        sched.add_task(Task::new("a", "A"));
        sched.with_inner(|inner| {
            inner.state.completed_tasks_count = 3;
            inner.state.failed_tasks_count = 1;
        });

        sched.clear_tasks();

        let state = sched.state();
        assert_eq!(state.completed_tasks_count, 0);
        assert_eq!(state.failed_tasks_count, 0);
        assert_eq!(sched.stats().total, 0);
    }

    #[test]
    fn test_query_by_priority_uses_config_default() {
        let sched = scheduler();
        sched.add_task(Task::new("plain", "Plain"));
        sched.add_task(Task::new("hot", "Hot").with_priority(TaskPriority::Urgent));

        let normal = sched.get_tasks_by_priority(TaskPriority::Normal);
        assert_eq!(normal.len(), 1);
        assert_eq!(normal[0].id, "plain");
    }

    #[test]
    fn test_shared_state_across_clones() {
        let sched = scheduler();
        let view = sched.clone();
        sched.add_task(Task::new("a", "A"));
        assert!(view.get_task("a").is_some());
    }
}
