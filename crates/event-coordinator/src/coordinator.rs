use crate::unit_of_work::{PendingLevelChange, UnitOfWork};
use crate::CoordinatorResult;
use event_outbox::{DeliveryQueue, EnqueueOutcome};
use mapping_rules::catalog::{PMPRO_CANCELLED, PMPRO_CHECKOUT, PMPRO_LEVEL_CHANGED};
use mapping_rules::{EventPayload, FieldResolver, PayloadValue, ResolvedEvent, UserId};
use tracing::{debug, error, info};

/// Result of one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Resolved and handed to the delivery queue.
    Queued(EnqueueOutcome),
    /// Held until flush.
    Deferred,
    /// Event type is switched off.
    Disabled,
    /// Unknown user or no email address.
    MissingIdentity,
    /// Configured with an empty output name.
    Unnamed,
}

/// Counts from [`EventCoordinator::flush`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub dispatched: usize,
    /// Dropped because the user checked out in the same unit of work.
    pub suppressed: usize,
    /// Disabled, unnamed or missing identity.
    pub skipped: usize,
    pub failed: usize,
}

/// Decides, per notification, whether to deliver now, defer or drop.
#[derive(Clone)]
pub struct EventCoordinator {
    resolver: FieldResolver,
    queue: DeliveryQueue,
}

impl EventCoordinator {
    pub fn new(resolver: FieldResolver, queue: DeliveryQueue) -> Self {
        Self { resolver, queue }
    }

    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }

    /// Start a unit of work.
    pub fn begin(&self) -> UnitOfWork {
        let uow = UnitOfWork::new();
        debug!(unit_of_work = %uow.id(), "Unit of work started");
        uow
    }

    /// Record the levels a user held before a level change.
    pub fn capture_old_levels(&self, uow: &mut UnitOfWork, user_id: UserId, level_names: Vec<String>) {
        uow.capture_old_levels(user_id, level_names);
    }

    /// Entry point for one real-time event.
    pub async fn notify(
        &self,
        uow: &mut UnitOfWork,
        event_key: &str,
        user_id: UserId,
        payload: EventPayload,
    ) -> CoordinatorResult<DispatchOutcome> {
        match event_key {
            PMPRO_CHECKOUT => {
                let outcome = self.dispatch(event_key, user_id, payload).await?;
                // Only a checkout that reached the queue stands in for the level change.
                if matches!(outcome, DispatchOutcome::Queued(_)) {
                    uow.mark_checkout(user_id);
                }
                Ok(outcome)
            }
            PMPRO_LEVEL_CHANGED => {
                let level_id = payload.get("level_id").and_then(PayloadValue::as_i64).unwrap_or(0);

                if level_id > 0 {
                    let new_level_name = payload
                        .get("new_level_name")
                        .map(PayloadValue::coerce_to_string)
                        .unwrap_or_default();
                    let old_level_names = uow.old_level_names(user_id);
                    uow.defer(PendingLevelChange {
                        user_id,
                        new_level_id: level_id,
                        new_level_name,
                        old_level_names,
                    });
                    debug!(user_id, level_id, unit_of_work = %uow.id(), "Level change deferred");
                    return Ok(DispatchOutcome::Deferred);
                }

                let mut cancelled = EventPayload::new();
                cancelled.insert(
                    "last_level_names".to_string(),
                    PayloadValue::Text(uow.old_level_names(user_id)),
                );
                self.dispatch(PMPRO_CANCELLED, user_id, cancelled).await
            }
            _ => self.dispatch(event_key, user_id, payload).await,
        }
    }

    /// End the unit of work: send held level changes for users who did not
    /// check out, drop the rest.
    pub async fn flush(&self, uow: UnitOfWork) -> FlushReport {
        let unit_id = uow.id();
        let (pending, checkout_users) = uow.into_parts();
        let mut report = FlushReport::default();

        for change in pending {
            if checkout_users.contains(&change.user_id) {
                debug!(
                    user_id = change.user_id,
                    unit_of_work = %unit_id,
                    "Level change suppressed by checkout"
                );
                report.suppressed += 1;
                continue;
            }

            let user_id = change.user_id;
            match self.dispatch(PMPRO_LEVEL_CHANGED, user_id, level_changed_payload(change)).await {
                Ok(DispatchOutcome::Queued(_)) => report.dispatched += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    error!(user_id, unit_of_work = %unit_id, error = %e, "Level change dispatch failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            unit_of_work = %unit_id,
            dispatched = report.dispatched,
            suppressed = report.suppressed,
            skipped = report.skipped,
            "Unit of work flushed"
        );
        report
    }

    async fn dispatch(
        &self,
        event_key: &str,
        user_id: UserId,
        payload: EventPayload,
    ) -> CoordinatorResult<DispatchOutcome> {
        let config = self.resolver.config_for(event_key)?;
        if !config.enabled {
            debug!(event_key, user_id, "Event disabled, skipping");
            return Ok(DispatchOutcome::Disabled);
        }

        let Some(identity) = self.resolver.deliverable_identity(user_id) else {
            debug!(event_key, user_id, "No deliverable identity, skipping");
            return Ok(DispatchOutcome::MissingIdentity);
        };

        let fields = self.resolver.apply(&config, user_id, &payload);
        if fields.output_event_name.is_empty() {
            debug!(event_key, user_id, "Empty output event name, skipping");
            return Ok(DispatchOutcome::Unnamed);
        }

        let event = ResolvedEvent::new(&identity, fields, payload);
        let outcome = self.queue.enqueue(event).await;
        Ok(DispatchOutcome::Queued(outcome))
    }
}

fn level_changed_payload(change: PendingLevelChange) -> EventPayload {
    let mut payload = EventPayload::new();
    payload.insert("level_id".to_string(), PayloadValue::Int(change.new_level_id));
    payload.insert("new_level_name".to_string(), PayloadValue::Text(change.new_level_name));
    payload.insert("old_level_names".to_string(), PayloadValue::Text(change.old_level_names));
    payload
}
