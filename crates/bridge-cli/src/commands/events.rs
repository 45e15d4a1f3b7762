//! Real-time event commands.

use crate::app::App;
use crate::output::{print_heading, print_json, print_row};
use crate::snapshot::Snapshot;
use anyhow::{bail, Context, Result};
use event_coordinator::{EventCoordinator, HostHooks, HostNotification};
use event_outbox::{send_test_event, DeliveryQueue, ScheduleQueue, TaskRouter, TaskScheduler, DELIVER_EVENT_TASK};
use mapping_rules::{EventPayload, UserId};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Print what an event would look like for a user. The enabled flag is
/// ignored.
pub fn resolve(app: &App, snapshot: &Path, event_key: &str, user_id: UserId, payload: &str) -> Result<()> {
    let snapshot = Arc::new(Snapshot::load(snapshot)?);
    let payload: EventPayload =
        serde_json::from_str(payload).context("--payload must be a JSON object of scalar values")?;

    match app.resolver(snapshot).build_event(event_key, user_id, payload)? {
        Some(event) => print_json(&event),
        None => bail!("User {} has no deliverable email address", user_id),
    }
}

/// Send `$BentoTest` for one user and report the API's answer.
pub async fn test_event(app: &App, snapshot: &Path, user_id: UserId) -> Result<()> {
    let snapshot = Arc::new(Snapshot::load(snapshot)?);
    let identity = app
        .resolver(snapshot)
        .deliverable_identity(user_id)
        .with_context(|| format!("User {} has no deliverable email address", user_id))?;

    let sender = app.sender()?;
    send_test_event(sender.as_ref(), &identity)
        .await
        .context("Test event failed")?;

    println!("Test event sent to {}", identity.email);
    Ok(())
}

/// Run recorded host callbacks as one unit of work, then deliver everything
/// it queued.
pub async fn replay(app: &App, snapshot: &Path, notifications: &Path) -> Result<()> {
    let snapshot = Arc::new(Snapshot::load(snapshot)?);
    let raw = std::fs::read_to_string(notifications)
        .with_context(|| format!("Failed to read {}", notifications.display()))?;
    let notifications: Vec<HostNotification> = serde_json::from_str(&raw).context("Invalid notification list")?;

    let schedule = Arc::new(ScheduleQueue::new());
    let scheduler: Arc<dyn TaskScheduler> = schedule.clone();
    let queue = DeliveryQueue::new(app.sender()?, Some(scheduler));

    let router = TaskRouter::new();
    router.register(DELIVER_EVENT_TASK, Arc::new(queue.clone()));

    let coordinator = EventCoordinator::new(app.resolver(snapshot.clone()), queue);
    let hooks = HostHooks::new(coordinator, snapshot);

    let report = hooks.run_unit_of_work(&notifications).await;
    let executed = schedule.run_until_idle(&router, usize::MAX).await;
    info!(notifications = notifications.len(), executed, "Replay finished");

    print_heading("Replay");
    print_row("Notifications", notifications.len());
    print_row("Level changes sent", report.dispatched);
    print_row("Level changes dropped", report.suppressed);
    print_row("Skipped at flush", report.skipped);
    print_row("Failed", report.failed);
    print_row("Deliveries run", executed);
    Ok(())
}
