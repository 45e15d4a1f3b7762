//! Host-driven task queue.
//!
//! Nothing runs on its own: the host calls [`ScheduleQueue::run_due`] from
//! its periodic runner (or [`ScheduleQueue::run_until_idle`] to drain), the
//! same way a cron-style job runner works.

use crate::{args_match, DeliveryResult, ScheduledTask, TaskHandle, TaskHandler, TaskScheduler};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Default)]
pub struct ScheduleQueue {
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl ScheduleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of pending tasks in run order.
    pub fn pending_tasks(&self) -> Vec<ScheduledTask> {
        let mut tasks = self.tasks.lock().clone();
        tasks.sort_by_key(|t| t.run_at);
        tasks
    }

    fn pop_next(&self, due_before: Option<DateTime<Utc>>) -> Option<ScheduledTask> {
        let mut tasks = self.tasks.lock();
        let index = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| due_before.map_or(true, |now| t.run_at <= now))
            .min_by_key(|(_, t)| t.run_at)
            .map(|(i, _)| i)?;
        Some(tasks.remove(index))
    }

    /// Run every task due at `now`, earliest first. Tasks scheduled while
    /// running are picked up if they are already due. Returns the number of
    /// tasks executed.
    pub async fn run_due(&self, now: DateTime<Utc>, handler: &dyn TaskHandler) -> usize {
        let mut executed = 0;
        while let Some(task) = self.pop_next(Some(now)) {
            execute(handler, &task).await;
            executed += 1;
        }
        executed
    }

    /// Run tasks in order, ignoring their scheduled time, until the queue is
    /// empty or `max_tasks` have run.
    pub async fn run_until_idle(&self, handler: &dyn TaskHandler, max_tasks: usize) -> usize {
        let mut executed = 0;
        while executed < max_tasks {
            let Some(task) = self.pop_next(None) else {
                break;
            };
            execute(handler, &task).await;
            executed += 1;
        }
        executed
    }
}

async fn execute(handler: &dyn TaskHandler, task: &ScheduledTask) {
    debug!(task = %task.name, task_id = %task.id, "Running task");
    if let Err(e) = handler.run(task).await {
        warn!(task = %task.name, task_id = %task.id, error = %e, "Task failed");
    }
}

impl TaskScheduler for ScheduleQueue {
    fn schedule(&self, name: &str, args: Value, run_at: DateTime<Utc>) -> DeliveryResult<TaskHandle> {
        let task = ScheduledTask::new(name, args, run_at);
        let handle = task.handle();
        self.tasks.lock().push(task);
        Ok(handle)
    }

    fn cancel(&self, name: &str, match_args: &Value) -> usize {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|t| !(t.name == name && args_match(&t.args, match_args)));
        before - tasks.len()
    }

    fn cancel_all(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let count = tasks.len();
        tasks.clear();
        count
    }

    fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}
