use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar carried in an event payload or an output attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Payload of one fired event. Lives only for the duration of a dispatch.
pub type EventPayload = BTreeMap<String, PayloadValue>;

/// Output attributes produced by the resolver.
pub type Attributes = BTreeMap<String, PayloadValue>;

impl PayloadValue {
    /// String form used for condition checks.
    ///
    /// Integral floats drop the fraction (`85.0` -> `"85"`), `true` is `"1"`
    /// and `false` is the empty string.
    pub fn coerce_to_string(&self) -> String {
        match self {
            PayloadValue::Bool(true) => "1".to_string(),
            PayloadValue::Bool(false) => String::new(),
            PayloadValue::Int(n) => n.to_string(),
            PayloadValue::Float(f) => f.to_string(),
            PayloadValue::Text(s) => s.clone(),
        }
    }

    pub fn empty() -> Self {
        PayloadValue::Text(String::new())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PayloadValue::Int(n) => Some(*n),
            PayloadValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            PayloadValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coerce_to_string())
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::Text(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Int(value)
    }
}

impl From<u64> for PayloadValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(PayloadValue::Int)
            .unwrap_or(PayloadValue::Float(value as f64))
    }
}

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        PayloadValue::Float(value)
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion() {
        assert_eq!(PayloadValue::Bool(true).coerce_to_string(), "1");
        assert_eq!(PayloadValue::Bool(false).coerce_to_string(), "");
        assert_eq!(PayloadValue::Int(-3).coerce_to_string(), "-3");
        assert_eq!(PayloadValue::Float(85.0).coerce_to_string(), "85");
        assert_eq!(PayloadValue::Float(0.5).coerce_to_string(), "0.5");
        assert_eq!(PayloadValue::from("Gold").coerce_to_string(), "Gold");
    }

    #[test]
    fn test_untagged_deserialize_keeps_scalar_kind() {
        let payload: EventPayload = serde_json::from_str(
            r#"{"level_id": 2, "order_total": 19.5, "pass": true, "level_name": "Gold"}"#,
        )
        .unwrap();
        assert_eq!(payload["level_id"], PayloadValue::Int(2));
        assert_eq!(payload["order_total"], PayloadValue::Float(19.5));
        assert_eq!(payload["pass"], PayloadValue::Bool(true));
        assert_eq!(payload["level_name"], PayloadValue::from("Gold"));
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(PayloadValue::Int(4).as_i64(), Some(4));
        assert_eq!(PayloadValue::from(" 12 ").as_i64(), Some(12));
        assert_eq!(PayloadValue::Float(2.0).as_i64(), Some(2));
        assert_eq!(PayloadValue::Float(2.5).as_i64(), None);
        assert_eq!(PayloadValue::Bool(true).as_i64(), None);
    }
}
