use crate::DeliveryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: Uuid,
    pub name: String,
    pub args: Value,
    pub run_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn new(name: impl Into<String>, args: Value, run_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            args,
            run_at,
        }
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            id: self.id,
            name: self.name.clone(),
            run_at: self.run_at,
        }
    }
}

/// Returned by [`TaskScheduler::schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: Uuid,
    pub name: String,
    pub run_at: DateTime<Utc>,
}

/// Runs named tasks at (or after) a given time, outside the caller.
pub trait TaskScheduler: Send + Sync {
    fn schedule(&self, name: &str, args: Value, run_at: DateTime<Utc>) -> DeliveryResult<TaskHandle>;

    /// Cancel pending tasks called `name` whose args contain every key/value
    /// of `match_args`. Returns how many were cancelled.
    fn cancel(&self, name: &str, match_args: &Value) -> usize;

    /// Cancel everything still pending.
    fn cancel_all(&self) -> usize;

    fn pending(&self) -> usize;
}

/// Executes a task when its time comes.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, task: &ScheduledTask) -> DeliveryResult<()>;
}

/// True when every entry of `pattern` (an object) is present and equal in
/// `args`. A non-object pattern must equal `args` exactly.
pub fn args_match(args: &Value, pattern: &Value) -> bool {
    match pattern {
        Value::Object(expected) => expected
            .iter()
            .all(|(key, value)| args.get(key) == Some(value)),
        other => args == other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_args_match_subset() {
        let args = json!({ "type": "primary", "offset": 25, "filter_id": 0 });

        assert!(args_match(&args, &json!({ "type": "primary" })));
        assert!(args_match(&args, &json!({})));
        assert!(!args_match(&args, &json!({ "type": "secondary" })));
        assert!(!args_match(&args, &json!({ "missing": 1 })));
        assert!(args_match(&json!([1]), &json!([1])));
    }

    #[test]
    fn test_handle_mirrors_task() {
        let task = ScheduledTask::new("bento_bridge.sync_page", json!({}), Utc::now());
        let handle = task.handle();
        assert_eq!(handle.id, task.id);
        assert_eq!(handle.name, "bento_bridge.sync_page");
    }
}
