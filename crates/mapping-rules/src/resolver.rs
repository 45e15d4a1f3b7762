use crate::model::{EventTypeConfig, ResolvedEvent, ResolvedFields, SourceKind, UserId, UserIdentity};
use crate::payload::{Attributes, EventPayload, PayloadValue};
use crate::sanitize::{sanitize_key, sanitize_text_field};
use crate::RulesResult;
use std::sync::Arc;
use tracing::debug;

/// Read access to the host's user records.
pub trait UserDirectory: Send + Sync {
    /// `None` when the user does not exist.
    fn identity(&self, user_id: UserId) -> Option<UserIdentity>;

    /// `None` when the attribute is not set.
    fn attribute(&self, user_id: UserId, name: &str) -> Option<String>;
}

/// Source of per-event-type configuration.
pub trait RuleSource: Send + Sync {
    /// `Ok(None)` when nothing was saved for this event type.
    fn event_config(&self, event_key: &str) -> RulesResult<Option<EventTypeConfig>>;
}

/// Evaluates mapping rules against a payload.
///
/// Resolution has no side effects: the same inputs always produce the same
/// attributes.
#[derive(Clone)]
pub struct FieldResolver {
    rules: Arc<dyn RuleSource>,
    users: Arc<dyn UserDirectory>,
}

impl FieldResolver {
    pub fn new(rules: Arc<dyn RuleSource>, users: Arc<dyn UserDirectory>) -> Self {
        Self { rules, users }
    }

    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    /// Saved configuration for `event_key`, or the built-in default.
    pub fn config_for(&self, event_key: &str) -> RulesResult<EventTypeConfig> {
        Ok(self
            .rules
            .event_config(event_key)?
            .unwrap_or_else(|| EventTypeConfig::default_for(event_key)))
    }

    /// Compute the output name and attributes for one event.
    ///
    /// The enabled flag is not consulted.
    pub fn resolve(
        &self,
        event_key: &str,
        user_id: UserId,
        payload: &EventPayload,
    ) -> RulesResult<ResolvedFields> {
        let config = self.config_for(event_key)?;
        Ok(self.apply(&config, user_id, payload))
    }

    /// Evaluate an already loaded configuration.
    pub fn apply(
        &self,
        config: &EventTypeConfig,
        user_id: UserId,
        payload: &EventPayload,
    ) -> ResolvedFields {
        let mut attributes = Attributes::new();

        for rule in &config.mapping_rules {
            if rule.output_key.is_empty() {
                continue;
            }

            if rule.is_conditional() {
                let actual = payload
                    .get(&rule.condition_key)
                    .map(PayloadValue::coerce_to_string)
                    .unwrap_or_default();
                if actual != rule.condition_value {
                    debug!(
                        output_key = %rule.output_key,
                        condition_key = %rule.condition_key,
                        "Mapping condition not met"
                    );
                    continue;
                }
            }

            let value = match rule.source_kind {
                SourceKind::Static => PayloadValue::Text(sanitize_text_field(&rule.source_value)),
                SourceKind::UserAttribute => PayloadValue::Text(
                    self.users
                        .attribute(user_id, &sanitize_key(&rule.source_value))
                        .unwrap_or_default(),
                ),
                SourceKind::EventPayload => payload
                    .get(&rule.source_value)
                    .cloned()
                    .unwrap_or_else(PayloadValue::empty),
            };

            attributes.insert(rule.output_key.clone(), value);
        }

        ResolvedFields {
            output_event_name: config.output_event_name.clone(),
            attributes,
        }
    }

    /// Resolve and attach the user's identity.
    ///
    /// `Ok(None)` when the user is unknown or has no email address.
    pub fn build_event(
        &self,
        event_key: &str,
        user_id: UserId,
        payload: EventPayload,
    ) -> RulesResult<Option<ResolvedEvent>> {
        let Some(identity) = self.deliverable_identity(user_id) else {
            return Ok(None);
        };
        let fields = self.resolve(event_key, user_id, &payload)?;
        Ok(Some(ResolvedEvent::new(&identity, fields, payload)))
    }

    /// The user's identity, if it can receive events.
    pub fn deliverable_identity(&self, user_id: UserId) -> Option<UserIdentity> {
        self.users
            .identity(user_id)
            .filter(|identity| !identity.email.trim().is_empty())
    }
}
