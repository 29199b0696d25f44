//! Raw add-on form values, as submitted with an add-to-cart.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::addon::AddonKind;
use crate::error::CommerceError;
use crate::ids::AddonFieldId;

/// A shopper's value for one add-on field.
///
/// The variant is the add-on kind; the upstream wire shape differs per kind
/// and is produced by [`AddonConfigValue::to_wire`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AddonConfigValue {
    /// Selected option index of a single-choice field.
    Choice(usize),
    /// Selected option indices of a multi-choice field.
    Choices(Vec<usize>),
    /// Free-form text.
    Text(String),
    /// Free-form number.
    Number(i64),
    /// A date, sent as ISO-8601.
    Date(NaiveDate),
}

impl AddonConfigValue {
    /// The add-on kind this value belongs to.
    pub fn kind(&self) -> AddonKind {
        match self {
            AddonConfigValue::Choice(_) => AddonKind::SingleChoice,
            AddonConfigValue::Choices(_) => AddonKind::MultiChoice,
            AddonConfigValue::Text(_) => AddonKind::Text,
            AddonConfigValue::Number(_) => AddonKind::Number,
            AddonConfigValue::Date(_) => AddonKind::Date,
        }
    }

    /// Encode in the shape the upstream add-item endpoint expects.
    pub fn to_wire(&self) -> Value {
        match self {
            AddonConfigValue::Choice(index) => Value::from(*index),
            AddonConfigValue::Choices(indices) => {
                Value::Array(indices.iter().map(|i| Value::from(*i)).collect())
            }
            AddonConfigValue::Text(text) => Value::String(text.clone()),
            AddonConfigValue::Number(n) => Value::from(*n),
            AddonConfigValue::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
        }
    }

    /// Parse a raw string (e.g. a `field=value` command-line pair) for a
    /// field of the given kind.
    ///
    /// Multi-choice indices are comma separated; dates are `YYYY-MM-DD`.
    pub fn parse(field: &AddonFieldId, kind: AddonKind, raw: &str) -> Result<Self, CommerceError> {
        let raw = raw.trim();
        let bad = |reason: &str| CommerceError::invalid_value(field.as_str(), reason);
        match kind {
            AddonKind::SingleChoice => raw
                .parse()
                .map(AddonConfigValue::Choice)
                .map_err(|_| bad("expected an option index")),
            AddonKind::MultiChoice => raw
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(|part| part.trim().parse::<usize>())
                .collect::<Result<Vec<_>, _>>()
                .map(AddonConfigValue::Choices)
                .map_err(|_| bad("expected comma separated option indices")),
            AddonKind::Text => Ok(AddonConfigValue::Text(raw.to_string())),
            AddonKind::Number => raw
                .parse()
                .map(AddonConfigValue::Number)
                .map_err(|_| bad("expected an integer")),
            AddonKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(AddonConfigValue::Date)
                .map_err(|_| bad("expected a YYYY-MM-DD date")),
        }
    }
}

/// All add-on values for one add-to-cart, keyed by field.
pub type AddonConfig = BTreeMap<AddonFieldId, AddonConfigValue>;

/// Encode a whole config as the upstream `addonConfig` object.
pub fn config_to_wire(config: &AddonConfig) -> serde_json::Map<String, Value> {
    config
        .iter()
        .map(|(field, value)| (field.as_str().to_string(), value.to_wire()))
        .collect()
}

/// A stable fingerprint of a config, used to recognise repeated add-to-cart
/// submissions of the same configuration.
pub fn config_fingerprint(config: &AddonConfig) -> String {
    Value::Object(config_to_wire(config)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shapes_per_kind() {
        assert_eq!(AddonConfigValue::Choice(2).to_wire(), json!(2));
        assert_eq!(AddonConfigValue::Choices(vec![0, 3]).to_wire(), json!([0, 3]));
        assert_eq!(
            AddonConfigValue::Text("Happy birthday".into()).to_wire(),
            json!("Happy birthday")
        );
        assert_eq!(AddonConfigValue::Number(4).to_wire(), json!(4));
        let date = NaiveDate::from_ymd_opt(2026, 12, 24).unwrap();
        assert_eq!(AddonConfigValue::Date(date).to_wire(), json!("2026-12-24"));
    }

    #[test]
    fn test_config_to_wire() {
        let mut config = AddonConfig::new();
        config.insert(AddonFieldId::new("wrap"), AddonConfigValue::Choice(1));
        config.insert(AddonFieldId::new("note"), AddonConfigValue::Text("hi".into()));

        let wire = Value::Object(config_to_wire(&config));
        assert_eq!(wire, json!({"note": "hi", "wrap": 1}));
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let mut a = AddonConfig::new();
        a.insert(AddonFieldId::new("b"), AddonConfigValue::Number(1));
        a.insert(AddonFieldId::new("a"), AddonConfigValue::Number(2));

        let mut b = AddonConfig::new();
        b.insert(AddonFieldId::new("a"), AddonConfigValue::Number(2));
        b.insert(AddonFieldId::new("b"), AddonConfigValue::Number(1));

        assert_eq!(config_fingerprint(&a), config_fingerprint(&b));
    }

    #[test]
    fn test_parse_by_kind() {
        let field = AddonFieldId::new("f");
        assert_eq!(
            AddonConfigValue::parse(&field, AddonKind::MultiChoice, "0, 2").unwrap(),
            AddonConfigValue::Choices(vec![0, 2])
        );
        assert_eq!(
            AddonConfigValue::parse(&field, AddonKind::Date, "2026-01-31").unwrap(),
            AddonConfigValue::Date(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap())
        );
        assert!(AddonConfigValue::parse(&field, AddonKind::SingleChoice, "first").is_err());
        assert!(AddonConfigValue::parse(&field, AddonKind::Date, "31/01/2026").is_err());
    }
}
