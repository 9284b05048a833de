//! Task Registry
//!
//! Owns the task table, the execution records, and the pending queue. The
//! tables are insertion-ordered so batch admission ties (equal priority)
//! resolve to registration order.

use indexmap::IndexMap;
use std::collections::VecDeque;

use super::model::{Execution, ExecutionStatus, Task, TaskPriority};

/// Storage for registered tasks and their run-records
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    tasks: IndexMap<String, Task>,
    executions: IndexMap<String, Execution>,
    queue: VecDeque<String>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a task; a fresh idle execution record replaces
    /// any prior one.
    pub(crate) fn insert(&mut self, task: Task) {
        let id = task.id.clone();
        self.executions.insert(id.clone(), Execution::new(&id));
        self.tasks.insert(id, task);
    }

    /// Remove a task, its execution record, and any queued entries for it
    pub(crate) fn remove(&mut self, id: &str) -> Option<Task> {
        self.executions.shift_remove(id);
        self.queue.retain(|queued| queued != id);
        self.tasks.shift_remove(id)
    }

    /// Drop all tasks, execution records, and queued entries
    pub(crate) fn clear(&mut self) {
        self.tasks.clear();
        self.executions.clear();
        self.queue.clear();
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn get_execution(&self, id: &str) -> Option<&Execution> {
        self.executions.get(id)
    }

    pub(crate) fn execution_mut(&mut self, id: &str) -> Option<&mut Execution> {
        self.executions.get_mut(id)
    }

    pub(crate) fn executions(&self) -> impl Iterator<Item = &Execution> {
        self.executions.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// All registered ids in registration order
    pub(crate) fn task_ids(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    /// Effective priority of a registered task, falling back to the
    /// scheduler-wide default for tasks without an override
    pub(crate) fn effective_priority(&self, id: &str, default: TaskPriority) -> TaskPriority {
        self.tasks
            .get(id)
            .and_then(|task| task.priority)
            .unwrap_or(default)
    }

    /// Tasks whose execution record currently has the given status
    pub(crate) fn tasks_by_status(&self, status: ExecutionStatus) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| {
                self.executions
                    .get(&task.id)
                    .is_some_and(|exec| exec.status == status)
            })
            .cloned()
            .collect()
    }

    /// Tasks whose effective priority matches
    pub(crate) fn tasks_by_priority(
        &self,
        priority: TaskPriority,
        default: TaskPriority,
    ) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| task.priority.unwrap_or(default) == priority)
            .cloned()
            .collect()
    }

    // ── Pending queue ────────────────────────────────────────────────

    pub(crate) fn enqueue(&mut self, ids: impl IntoIterator<Item = String>) {
        self.queue.extend(ids);
    }

    /// Whether the id still has a pending (unfinished) queue entry
    pub(crate) fn queue_contains(&self, id: &str) -> bool {
        self.queue.iter().any(|queued| queued == id)
    }

    /// Remove every queue entry for the id; returns whether any was present
    pub(crate) fn remove_from_queue(&mut self, id: &str) -> bool {
        let before = self.queue.len();
        self.queue.retain(|queued| queued != id);
        self.queue.len() != before
    }

    pub(crate) fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
