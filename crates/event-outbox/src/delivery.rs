use crate::{DeliveryError, DeliveryResult, EventSender, ScheduledTask, TaskHandle, TaskHandler, TaskScheduler};
use async_trait::async_trait;
use chrono::Utc;
use mapping_rules::ResolvedEvent;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Task name for deferred event delivery.
pub const DELIVER_EVENT_TASK: &str = "bento_bridge.deliver_event";

/// What happened to an enqueued event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Handed to the scheduler; delivery happens later.
    Scheduled(TaskHandle),
    /// No scheduler: delivered inline.
    Delivered,
    /// No scheduler: inline delivery failed (already logged).
    Failed,
}

/// Fire-and-continue delivery.
///
/// With a scheduler, [`enqueue`](DeliveryQueue::enqueue) only records a
/// `bento_bridge.deliver_event` task; the API call happens when that task
/// runs through this queue's [`TaskHandler`] impl. Without one, the event is
/// sent inline. Delivery errors are logged and never returned.
#[derive(Clone)]
pub struct DeliveryQueue {
    sender: Arc<dyn EventSender>,
    scheduler: Option<Arc<dyn TaskScheduler>>,
}

impl DeliveryQueue {
    pub fn new(sender: Arc<dyn EventSender>, scheduler: Option<Arc<dyn TaskScheduler>>) -> Self {
        Self { sender, scheduler }
    }

    /// Queue without a scheduler: every enqueue delivers inline.
    pub fn inline(sender: Arc<dyn EventSender>) -> Self {
        Self::new(sender, None)
    }

    pub fn sender(&self) -> &Arc<dyn EventSender> {
        &self.sender
    }

    pub async fn enqueue(&self, event: ResolvedEvent) -> EnqueueOutcome {
        if let Some(scheduler) = &self.scheduler {
            match self.schedule_on(scheduler.as_ref(), &event) {
                Ok(handle) => {
                    debug!(
                        user_id = event.user_id,
                        event_name = %event.output_event_name,
                        task_id = %handle.id,
                        "Event queued"
                    );
                    return EnqueueOutcome::Scheduled(handle);
                }
                Err(e) => warn!(
                    user_id = event.user_id,
                    event_name = %event.output_event_name,
                    error = %e,
                    "Scheduling failed, delivering inline"
                ),
            }
        }

        if self.deliver(&event).await {
            EnqueueOutcome::Delivered
        } else {
            EnqueueOutcome::Failed
        }
    }

    fn schedule_on(&self, scheduler: &dyn TaskScheduler, event: &ResolvedEvent) -> DeliveryResult<TaskHandle> {
        let args = serde_json::to_value(event)?;
        scheduler.schedule(DELIVER_EVENT_TASK, args, Utc::now())
    }

    /// Send and log; returns whether delivery succeeded.
    async fn deliver(&self, event: &ResolvedEvent) -> bool {
        match self.sender.send_event(event).await {
            Ok(()) => {
                info!(
                    user_id = event.user_id,
                    event_name = %event.output_event_name,
                    "Event sent"
                );
                true
            }
            Err(e) => {
                warn!(
                    user_id = event.user_id,
                    event_name = %event.output_event_name,
                    error = %e,
                    "Event delivery failed"
                );
                false
            }
        }
    }
}

#[async_trait]
impl TaskHandler for DeliveryQueue {
    async fn run(&self, task: &ScheduledTask) -> DeliveryResult<()> {
        let event: ResolvedEvent = serde_json::from_value(task.args.clone())
            .map_err(|e| DeliveryError::InvalidArgs(e.to_string()))?;
        self.deliver(&event).await;
        Ok(())
    }
}
