//! Event catalog, mapping rules and the field resolver.
//!
//! An integration administrator configures, per event type, whether the
//! event is forwarded, the name it is delivered under and an ordered list of
//! [`MappingRule`]s. The [`FieldResolver`] evaluates those rules against one
//! event payload and a user-attribute lookup to produce the outgoing
//! attribute map.
//!
//! Raw settings coming from a form or file go through
//! [`sanitize_settings`] before they are persisted, so the resolver only
//! ever sees well-formed rows.

pub mod catalog;
mod error;
mod model;
mod payload;
mod resolver;
mod sanitize;
mod settings;

pub use catalog::{EventDefinition, Integration, EVENT_DEFINITIONS};
pub use error::{RulesError, RulesResult};
pub use model::{
    EventTypeConfig, IntegrationSettings, MappingRule, ResolvedEvent, ResolvedFields, SourceKind,
    UserId, UserIdentity,
};
pub use payload::{Attributes, EventPayload, PayloadValue};
pub use resolver::{FieldResolver, RuleSource, UserDirectory};
pub use sanitize::{sanitize_key, sanitize_settings, sanitize_text_field};
pub use settings::SettingsRepository;
