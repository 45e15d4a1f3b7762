use crate::{DeliveryError, DeliveryResult, ScheduledTask, TaskHandler};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Dispatches tasks to the handler registered for their name.
#[derive(Default)]
pub struct TaskRouter {
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl TaskRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `name`.
    pub fn register(&self, name: &str, handler: Arc<dyn TaskHandler>) {
        self.handlers.write().insert(name.to_string(), handler);
        debug!(task = name, "Task handler registered");
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }
}

#[async_trait]
impl TaskHandler for TaskRouter {
    async fn run(&self, task: &ScheduledTask) -> DeliveryResult<()> {
        let handler = self
            .handlers
            .read()
            .get(&task.name)
            .cloned()
            .ok_or_else(|| DeliveryError::UnknownTask(task.name.clone()))?;
        handler.run(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Counting(Mutex<Vec<String>>);

    #[async_trait]
    impl TaskHandler for Counting {
        async fn run(&self, task: &ScheduledTask) -> DeliveryResult<()> {
            self.0.lock().push(task.name.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_routes_by_name() {
        let router = TaskRouter::new();
        let handler = Arc::new(Counting::default());
        router.register("a", handler.clone());

        router
            .run(&ScheduledTask::new("a", json!({}), Utc::now()))
            .await
            .unwrap();
        assert_eq!(handler.0.lock().as_slice(), ["a".to_string()]);
        assert!(router.has_handler("a"));
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let router = TaskRouter::new();
        let err = router
            .run(&ScheduledTask::new("nope", json!({}), Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::UnknownTask(name) if name == "nope"));
    }
}
