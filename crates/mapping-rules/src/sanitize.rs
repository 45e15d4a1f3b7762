//! Normalisation applied at the settings-save boundary.
//!
//! Rows with an empty key are dropped and unknown source kinds become
//! `static` here, so invalid rules can never be persisted.

use crate::catalog::EVENT_DEFINITIONS;
use crate::model::{EventTypeConfig, IntegrationSettings, MappingRule, SourceKind};
use serde_json::Value;

/// Lowercase and keep only `[a-z0-9_-]`.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            (c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-').then_some(c)
        })
        .collect()
}

/// Plain-text sanitiser: strips markup and percent-encoded octets, collapses
/// whitespace runs (including newlines and tabs) to one space, trims.
pub fn sanitize_text_field(raw: &str) -> String {
    let without_tags = strip_tags(raw);
    let without_octets = strip_octets(&without_tags);
    without_octets.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        // A lone `<` not followed by a tag start is text.
        let opens_tag = c == '<'
            && chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?'));

        if opens_tag {
            for inner in chars.by_ref() {
                if inner == '>' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn strip_octets(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if bytes[i] == b'%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
        {
            i += 3;
            continue;
        }
        // Advance by whole characters to stay on UTF-8 boundaries.
        let ch_len = raw[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        out.push_str(&raw[i..i + ch_len]);
        i += ch_len;
    }
    out
}

/// Normalise a raw settings submission.
///
/// Only catalog events are kept. Non-object input yields empty settings.
pub fn sanitize_settings(raw: &Value) -> IntegrationSettings {
    let mut clean = IntegrationSettings::default();
    let Some(raw) = raw.as_object() else {
        return clean;
    };

    for def in EVENT_DEFINITIONS {
        let event_raw = raw.get(def.key).unwrap_or(&Value::Null);

        let event_name = match event_raw.get("event_name").filter(|v| !v.is_null()) {
            Some(value) => sanitize_text_field(&scalar_text(value)),
            None => def.default_event.to_string(),
        };

        clean.insert(
            def.key,
            EventTypeConfig {
                enabled: is_truthy(event_raw.get("enabled")),
                output_event_name: event_name,
                mapping_rules: sanitize_rules(event_raw.get("custom_fields")),
            },
        );
    }

    clean
}

fn sanitize_rules(rows: Option<&Value>) -> Vec<MappingRule> {
    let Some(rows) = rows else {
        return Vec::new();
    };
    // Form submissions arrive either as a list or as an index-keyed object.
    let rows: Vec<&Value> = match rows {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => return Vec::new(),
    };

    rows.into_iter()
        .filter_map(|row| {
            let field = |name: &str| row.get(name).map(scalar_text).unwrap_or_default();

            let output_key = sanitize_key(&field("key"));
            if output_key.is_empty() {
                return None;
            }

            Some(MappingRule {
                output_key,
                source_kind: SourceKind::parse(&field("source_type")).unwrap_or(SourceKind::Static),
                source_value: sanitize_text_field(&field("source_value")),
                condition_key: sanitize_key(&field("condition_key")),
                condition_value: sanitize_text_field(&field("condition_value")),
            })
        })
        .collect()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        _ => String::new(),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}
