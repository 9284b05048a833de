//! Aggregate Statistics
//!
//! Derives per-status counts and timing aggregates from the execution
//! records.

use serde::Serialize;

use super::model::ExecutionStatus;
use super::registry::TaskRegistry;

/// Snapshot of per-status counts and the mean completed duration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerStats {
    /// Registered task count
    pub total: usize,
    pub idle: usize,
    pub running: usize,
    pub paused: usize,
    pub completed: usize,
    pub error: usize,
    /// Mean wall-clock duration of completed executions in milliseconds;
    /// 0.0 when nothing has completed
    pub avg_execution_time: f64,
}

impl SchedulerStats {
    pub(crate) fn aggregate(registry: &TaskRegistry) -> Self {
        let mut stats = SchedulerStats {
            total: registry.len(),
            ..SchedulerStats::default()
        };

        let mut completed_ms: u64 = 0;
        let mut completed_timed: usize = 0;

        for exec in registry.executions() {
            match exec.status {
                ExecutionStatus::Idle => stats.idle += 1,
                ExecutionStatus::Running => stats.running += 1,
                ExecutionStatus::Paused => stats.paused += 1,
                ExecutionStatus::Completed => {
                    stats.completed += 1;
                    if let Some(ms) = exec.duration_ms() {
                        completed_ms += ms;
                        completed_timed += 1;
                    }
                }
                ExecutionStatus::Error => stats.error += 1,
            }
        }

        if completed_timed > 0 {
            stats.avg_execution_time = completed_ms as f64 / completed_timed as f64;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::model::Task;
    use chrono::{TimeDelta, Utc};

    #[test]
    fn test_empty_registry_yields_zeroes() {
        let registry = TaskRegistry::new();
        let stats = SchedulerStats::aggregate(&registry);
        assert_eq!(stats, SchedulerStats::default());
    }

    #[test]
    fn test_avg_is_zero_without_completions() {
        let mut registry = TaskRegistry::new();
        registry.insert(Task::new("a", "A"));
        if let Some(exec) = registry.execution_mut("a") {
            exec.status = ExecutionStatus::Running;
        }

        let stats = SchedulerStats::aggregate(&registry);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.avg_execution_time, 0.0);
    }

    #[test]
    fn test_counts_and_average() {
        let mut registry = TaskRegistry::new();
        for id in ["a", "b", "c", "d"] {
            registry.insert(Task::new(id, id.to_uppercase()));
        }

        let start = Utc::now();
        for (id, ms) in [("a", 100), ("b", 300)] {
            if let Some(exec) = registry.execution_mut(id) {
                exec.status = ExecutionStatus::Completed;
                exec.start_time = Some(start);
                exec.end_time = Some(start + TimeDelta::milliseconds(ms));
            }
        }
        if let Some(exec) = registry.execution_mut("c") {
            exec.status = ExecutionStatus::Error;
        }

        let stats = SchedulerStats::aggregate(&registry);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.error, 1);
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.avg_execution_time, 200.0);
    }

    #[test]
    fn test_completed_without_stamps_excluded_from_average() {
        let mut registry = TaskRegistry::new();
        registry.insert(Task::new("a", "A"));
        if let Some(exec) = registry.execution_mut("a") {
            exec.status = ExecutionStatus::Completed;
            // no timestamps recorded
        }

        let stats = SchedulerStats::aggregate(&registry);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.avg_execution_time, 0.0);
    }
}
