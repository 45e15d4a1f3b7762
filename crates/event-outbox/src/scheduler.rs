//! Timer-based scheduler on a Tokio runtime.
//!
//! Each scheduled task gets its own sleeping future. A task is cancelled by
//! removing it from the pending map; the timer checks the map before running
//! and exits quietly when its entry is gone.

use crate::{args_match, DeliveryError, DeliveryResult, ScheduledTask, TaskHandle, TaskHandler, TaskScheduler};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use uuid::Uuid;

type HandlerSlot = Arc<RwLock<Option<Arc<dyn TaskHandler>>>>;

pub struct TokioScheduler {
    runtime: Handle,
    pending: Arc<Mutex<HashMap<Uuid, ScheduledTask>>>,
    handler: HandlerSlot,
}

impl TokioScheduler {
    /// Scheduler bound to the current runtime.
    ///
    /// Fails when called outside a Tokio runtime.
    pub fn new() -> DeliveryResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| DeliveryError::Scheduler(format!("no Tokio runtime: {}", e)))?;
        Ok(Self::with_handle(runtime))
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Arc::new(Mutex::new(HashMap::new())),
            handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the handler that runs fired tasks. Tasks firing while no handler
    /// is set are dropped with a warning.
    pub fn set_handler(&self, handler: Arc<dyn TaskHandler>) {
        *self.handler.write() = Some(handler);
    }

    pub fn clear_handler(&self) {
        *self.handler.write() = None;
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule(&self, name: &str, args: Value, run_at: DateTime<Utc>) -> DeliveryResult<TaskHandle> {
        let task = ScheduledTask::new(name, args, run_at);
        let handle = task.handle();
        let id = task.id;
        self.pending.lock().insert(id, task);

        let pending = self.pending.clone();
        let handler_slot = self.handler.clone();
        let delay = (run_at - Utc::now()).to_std().unwrap_or_default();

        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(task) = pending.lock().remove(&id) else {
                debug!(task_id = %id, "Task cancelled before firing");
                return;
            };
            let handler = handler_slot.read().clone();

            match handler {
                Some(handler) => {
                    if let Err(e) = handler.run(&task).await {
                        warn!(task = %task.name, task_id = %task.id, error = %e, "Task failed");
                    }
                }
                None => warn!(task = %task.name, "No task handler set, dropping task"),
            }
        });

        debug!(task = name, task_id = %id, run_at = %run_at, "Task scheduled");
        Ok(handle)
    }

    fn cancel(&self, name: &str, match_args: &Value) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|_, t| !(t.name == name && args_match(&t.args, match_args)));
        before - pending.len()
    }

    fn cancel_all(&self) -> usize {
        let mut pending = self.pending.lock();
        let count = pending.len();
        pending.clear();
        count
    }

    fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;
    use tokio::sync::mpsc;

    struct Forward(mpsc::UnboundedSender<Value>);

    #[async_trait]
    impl TaskHandler for Forward {
        async fn run(&self, task: &ScheduledTask) -> DeliveryResult<()> {
            let _ = self.0.send(task.args.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fires_scheduled_task() {
        let scheduler = TokioScheduler::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        scheduler.set_handler(Arc::new(Forward(tx)));

        scheduler.schedule("t", json!({ "n": 1 }), Utc::now()).unwrap();

        let fired = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fired, json!({ "n": 1 }));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_task_never_fires() {
        let scheduler = TokioScheduler::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        scheduler.set_handler(Arc::new(Forward(tx)));

        let run_at = Utc::now() + Duration::milliseconds(50);
        scheduler.schedule("sync", json!({ "type": "primary" }), run_at).unwrap();
        scheduler.schedule("sync", json!({ "type": "secondary" }), run_at).unwrap();
        assert_eq!(scheduler.cancel("sync", &json!({ "type": "primary" })), 1);

        let fired = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fired, json!({ "type": "secondary" }));

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        assert!(matches!(
            TokioScheduler::new(),
            Err(DeliveryError::Scheduler(_))
        ));
    }
}
