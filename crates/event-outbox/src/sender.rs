use crate::DeliveryResult;
use async_trait::async_trait;
use mapping_rules::{Attributes, EventPayload, PayloadValue, ResolvedEvent, UserIdentity};
use tracing::info;

/// Output name of the connectivity probe.
pub const TEST_EVENT_NAME: &str = "$BentoTest";

/// Delivers one resolved event to the external API.
#[async_trait]
pub trait EventSender: Send + Sync {
    async fn send_event(&self, event: &ResolvedEvent) -> DeliveryResult<()>;
}

/// Send a `$BentoTest` event for `identity`, synchronously.
///
/// Unlike regular deliveries the error is returned to the caller.
pub async fn send_test_event(
    sender: &dyn EventSender,
    identity: &UserIdentity,
) -> DeliveryResult<()> {
    let mut payload = EventPayload::new();
    payload.insert("source".to_string(), PayloadValue::from("bento-bridge"));

    let event = ResolvedEvent {
        user_id: identity.id,
        output_event_name: TEST_EVENT_NAME.to_string(),
        email: identity.email.clone(),
        payload,
        attributes: Attributes::new(),
    };

    sender.send_event(&event).await?;
    info!(user_id = identity.id, "Test event delivered");
    Ok(())
}
