//! Execution Engine
//!
//! Drives registered tasks through their run lifecycle: admission under the
//! concurrency ceiling, timeout enforcement, fixed-delay retries, and
//! record/counter bookkeeping.

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::cmp::Reverse;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::model::{ExecutionStatus, ProgressFn, TaskContext};
use super::TaskScheduler;
use crate::error::TaskError;

impl TaskScheduler {
    /// Run a single task to completion, honoring its timeout and retry
    /// budget.
    ///
    /// A missing task or execution record is logged and ignored; run
    /// failures are captured into the execution record and surfaced through
    /// `on_error`, never returned.
    pub async fn execute_task(&self, id: &str) {
        self.run_task(id).await;
    }

    /// Run a batch of tasks under the configured concurrency ceiling
    ///
    /// Ids are admitted in descending priority order (stable on ties), with
    /// up to `max_concurrent` runs in flight. A new run is admitted each
    /// time the fastest outstanding run resolves, so uneven task durations
    /// can transiently leave admission slots idle. Resolves once every
    /// submitted id has finished or left the pending queue.
    pub async fn execute_tasks(&self, ids: Vec<String>) {
        let default_priority = self.config.priority;
        let batch = self
            .with_inner(|inner| {
                let mut sorted = ids;
                sorted.sort_by_key(|id| {
                    Reverse(inner.registry.effective_priority(id, default_priority).weight())
                });
                inner.registry.enqueue(sorted.iter().cloned());
                inner.publish_queue_size();
                sorted
            })
            .unwrap_or_default();

        info!(count = batch.len(), "batch submitted");

        // a ceiling of zero could never drain the queue
        let max_concurrent = self.config.max_concurrent.max(1);

        let mut pending = batch.into_iter();
        let mut inflight = FuturesUnordered::new();

        while inflight.len() < max_concurrent {
            match self.next_admissible(&mut pending) {
                Some(id) => inflight.push(self.admit(id)),
                None => break,
            }
        }

        while let Some(finished) = inflight.next().await {
            self.with_inner(|inner| {
                inner.registry.remove_from_queue(&finished);
                inner.publish_queue_size();
            });
            if let Some(id) = self.next_admissible(&mut pending) {
                inflight.push(self.admit(id));
            }
        }

        debug!("batch finished");
    }

    /// Run every registered task as one batch
    pub async fn execute_all(&self) {
        let ids = self
            .with_inner(|inner| inner.registry.task_ids())
            .unwrap_or_default();
        self.execute_tasks(ids).await;
    }

    /// Next batch id that still has a pending queue entry
    ///
    /// Ids dropped from the queue before admission (`remove_task`, `stop`)
    /// are skipped and never run.
    fn next_admissible(&self, pending: &mut std::vec::IntoIter<String>) -> Option<String> {
        for id in pending.by_ref() {
            let queued = self
                .with_inner(|inner| inner.registry.queue_contains(&id))
                .unwrap_or(false);
            if queued {
                return Some(id);
            }
            debug!(task_id = %id, "queue entry gone before admission, skipping");
        }
        None
    }

    fn admit(&self, id: String) -> impl Future<Output = String> + '_ {
        async move {
            self.run_task(&id).await;
            id
        }
    }

    async fn run_task(&self, id: &str) {
        let Some(task) = self
            .with_inner(|inner| {
                inner.registry.get_execution(id)?;
                inner.registry.get(id).cloned()
            })
            .flatten()
        else {
            warn!(task_id = %id, "no task or execution record, skipping run");
            return;
        };

        let timeout = task.timeout.unwrap_or_else(|| self.config.timeout());
        let max_retries = task.retries.unwrap_or(self.config.max_retries);
        let retry_delay = self.config.retry_delay();

        self.with_inner(|inner| {
            if let Some(exec) = inner.registry.execution_mut(id) {
                exec.status = ExecutionStatus::Running;
                exec.start_time = Some(Utc::now());
            }
            inner.state.active_tasks_count += 1;
        });
        debug!(task_id = %id, timeout_ms = timeout.as_millis() as u64, "run started");

        let progress_sink: ProgressFn = {
            let inner = Arc::clone(&self.inner);
            let task_id = id.to_string();
            let forward = task.on_progress.clone();
            Arc::new(move |percent: u8| {
                if let Ok(mut guard) = inner.lock() {
                    if let Some(exec) = guard.registry.execution_mut(&task_id) {
                        exec.progress = percent;
                    }
                }
                if let Some(cb) = &forward {
                    cb(percent);
                }
            })
        };

        loop {
            let cancel = CancellationToken::new();
            let ctx = TaskContext::new(
                id.to_string(),
                task.data.clone(),
                cancel.clone(),
                progress_sink.clone(),
            );

            let outcome = match &task.execute {
                Some(execute) => {
                    let body = execute(ctx);
                    tokio::select! {
                        result = body => result,
                        () = tokio::time::sleep(timeout) => {
                            // the deadline only discards the race; the token
                            // is the body's chance to stop its own work
                            cancel.cancel();
                            Err(TaskError::Timeout)
                        }
                    }
                }
                None => Err(TaskError::MissingExecute { id: id.to_string() }),
            };

            match outcome {
                Ok(result) => {
                    let now = Utc::now();
                    self.with_inner(|inner| {
                        if let Some(exec) = inner.registry.execution_mut(id) {
                            exec.status = ExecutionStatus::Completed;
                            exec.progress = 100;
                            exec.end_time = Some(now);
                            exec.result = Some(result.clone());
                        }
                        inner.state.active_tasks_count =
                            inner.state.active_tasks_count.saturating_sub(1);
                        inner.state.completed_tasks_count += 1;
                        inner.state.last_task_execution_time = Some(now);
                    });
                    info!(task_id = %id, "run completed");
                    if let Some(cb) = &task.on_complete {
                        cb(&result);
                    }
                    return;
                }
                Err(err) => {
                    let will_retry = self
                        .with_inner(|inner| match inner.registry.execution_mut(id) {
                            Some(exec) if exec.retry_count < max_retries => {
                                exec.retry_count += 1;
                                true
                            }
                            _ => false,
                        })
                        .unwrap_or(false);

                    if will_retry {
                        debug!(task_id = %id, error = %err, "attempt failed, retrying");
                        // fixed delay between attempts, no backoff;
                        // start_time keeps the first attempt's stamp
                        tokio::time::sleep(retry_delay).await;
                        continue;
                    }

                    let now = Utc::now();
                    self.with_inner(|inner| {
                        if let Some(exec) = inner.registry.execution_mut(id) {
                            exec.status = ExecutionStatus::Error;
                            exec.end_time = Some(now);
                            exec.error = Some(err.to_string());
                        }
                        inner.state.active_tasks_count =
                            inner.state.active_tasks_count.saturating_sub(1);
                        inner.state.failed_tasks_count += 1;
                    });
                    warn!(task_id = %id, error = %err, "run failed, retry budget exhausted");
                    if let Some(cb) = &task.on_error {
                        cb(&err);
                    }
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::scheduler::Task;
    use serde_json::json;

    fn quick_config() -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent: 2,
            max_retries: 0,
            retry_delay_ms: 1,
            timeout_ms: 5_000,
            ..SchedulerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_single_run_updates_record_and_counters() {
        let sched = TaskScheduler::new(quick_config());
        sched.add_task(
            Task::new("ok", "Ok").with_execute(|_ctx| async { Ok(json!({"done": true})) }),
        );

        sched.execute_task("ok").await;

        let exec = sched.get_execution("ok").unwrap();
        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert_eq!(exec.progress, 100);
        assert!(exec.start_time.is_some());
        assert!(exec.end_time.is_some());
        assert_eq!(exec.result, Some(json!({"done": true})));

        let state = sched.state();
        assert_eq!(state.active_tasks_count, 0);
        assert_eq!(state.completed_tasks_count, 1);
        assert!(state.last_task_execution_time.is_some());
    }

    #[tokio::test]
    async fn test_missing_execute_becomes_terminal_error() {
        let sched = TaskScheduler::new(quick_config());
        sched.add_task(Task::new("hollow", "Hollow"));

        sched.execute_task("hollow").await;

        let exec = sched.get_execution("hollow").unwrap();
        assert_eq!(exec.status, ExecutionStatus::Error);
        assert_eq!(
            exec.error.as_deref(),
            Some("Task 'hollow' has no execute capability")
        );
        assert_eq!(sched.state().failed_tasks_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_a_logged_no_op() {
        let sched = TaskScheduler::new(quick_config());
        sched.execute_task("ghost").await;
        assert_eq!(sched.state().active_tasks_count, 0);
        assert_eq!(sched.state().failed_tasks_count, 0);
    }

    #[tokio::test]
    async fn test_body_error_recorded_with_message() {
        let sched = TaskScheduler::new(quick_config());
        sched.add_task(
            Task::new("broken", "Broken")
                .with_execute(|_ctx| async { Err(TaskError::failed("disk full")) }),
        );

        sched.execute_task("broken").await;

        let exec = sched.get_execution("broken").unwrap();
        assert_eq!(exec.status, ExecutionStatus::Error);
        assert_eq!(exec.error.as_deref(), Some("disk full"));
    }
}
