use crate::catalog;
use crate::payload::{Attributes, EventPayload};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type UserId = u64;

/// Where a mapping rule reads its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// The literal `source_value`.
    #[serde(rename = "static")]
    Static,
    /// A user attribute named by `source_value`.
    #[serde(rename = "user_meta")]
    UserAttribute,
    /// A payload field named by `source_value`.
    #[serde(rename = "event_data")]
    EventPayload,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Static => "static",
            SourceKind::UserAttribute => "user_meta",
            SourceKind::EventPayload => "event_data",
        }
    }

    /// Parse a wire name; anything unrecognised is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "static" => Some(SourceKind::Static),
            "user_meta" => Some(SourceKind::UserAttribute),
            "event_data" => Some(SourceKind::EventPayload),
            _ => None,
        }
    }
}

/// One configured output attribute, optionally gated by an equality check
/// against the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    #[serde(rename = "key")]
    pub output_key: String,
    #[serde(rename = "source_type")]
    pub source_kind: SourceKind,
    #[serde(default)]
    pub source_value: String,
    /// Empty means unconditional.
    #[serde(default)]
    pub condition_key: String,
    #[serde(default)]
    pub condition_value: String,
}

impl MappingRule {
    pub fn new(output_key: impl Into<String>, source_kind: SourceKind, source_value: impl Into<String>) -> Self {
        Self {
            output_key: output_key.into(),
            source_kind,
            source_value: source_value.into(),
            condition_key: String::new(),
            condition_value: String::new(),
        }
    }

    pub fn when(mut self, condition_key: impl Into<String>, condition_value: impl Into<String>) -> Self {
        self.condition_key = condition_key.into();
        self.condition_value = condition_value.into();
        self
    }

    pub fn is_conditional(&self) -> bool {
        !self.condition_key.is_empty()
    }
}

/// Per-event-type configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "event_name", default)]
    pub output_event_name: String,
    #[serde(rename = "custom_fields", default)]
    pub mapping_rules: Vec<MappingRule>,
}

impl EventTypeConfig {
    /// Disabled, default name, no rules.
    pub fn default_for(event_key: &str) -> Self {
        Self {
            enabled: false,
            output_event_name: catalog::default_event_name(event_key),
            mapping_rules: Vec::new(),
        }
    }
}

/// Every persisted event-type configuration, keyed by event key.
///
/// A stored config without `event_name` takes the catalog's default name
/// for its key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IntegrationSettings(pub BTreeMap<String, EventTypeConfig>);

#[derive(Deserialize)]
struct StoredEventTypeConfig {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    event_name: Option<String>,
    #[serde(default)]
    custom_fields: Vec<MappingRule>,
}

impl<'de> Deserialize<'de> for IntegrationSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = BTreeMap::<String, StoredEventTypeConfig>::deserialize(deserializer)?;
        Ok(Self(
            stored
                .into_iter()
                .map(|(key, config)| {
                    let output_event_name = config
                        .event_name
                        .unwrap_or_else(|| catalog::default_event_name(&key));
                    let config = EventTypeConfig {
                        enabled: config.enabled,
                        output_event_name,
                        mapping_rules: config.custom_fields,
                    };
                    (key, config)
                })
                .collect(),
        ))
    }
}

impl IntegrationSettings {
    pub fn get(&self, event_key: &str) -> Option<&EventTypeConfig> {
        self.0.get(event_key)
    }

    pub fn insert(&mut self, event_key: impl Into<String>, config: EventTypeConfig) {
        self.0.insert(event_key.into(), config);
    }

    pub fn enabled_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, config)| config.enabled)
            .map(|(key, _)| key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A user record as far as delivery is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: String,
}

/// Output of [`FieldResolver::resolve`](crate::FieldResolver::resolve).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFields {
    pub output_event_name: String,
    pub attributes: Attributes,
}

/// A fully computed event, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEvent {
    pub user_id: UserId,
    pub output_event_name: String,
    pub email: String,
    pub payload: EventPayload,
    pub attributes: Attributes,
}

impl ResolvedEvent {
    pub fn new(identity: &UserIdentity, fields: ResolvedFields, payload: EventPayload) -> Self {
        Self {
            user_id: identity.id,
            output_event_name: fields.output_event_name,
            email: identity.email.clone(),
            payload,
            attributes: fields.attributes,
        }
    }
}
