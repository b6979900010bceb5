//! Column-name keyed coercion of JSON cells into typed values.
//!
//! The remote service returns every number as a JSON number and every
//! timestamp as either RFC 3339 text or epoch seconds. Which Rust type a cell
//! should become depends on the column it belongs to, so the rules live in an
//! explicit [`CoercionTable`] that is built once per connection and shared by
//! every result cursor.

use crate::error::ConversionError;
use crate::types::conversion::{integral_number, number_to_i64, parse_bool_str, parse_rfc3339};
use crate::types::value::{JsonScalar, Value};
use std::collections::HashMap;

/// Columns whose values are numeric counters, sizes or identifiers.
const INTEGER_COLUMNS: &[&str] = &[
    "block_size",
    "nonce",
    "version",
    "version_hex",
    "block_time",
    "id",
    "effective_amount",
    "certificate_amount",
    "frame_width",
    "frame_height",
    "duration",
    "channel_claim_count",
    "claim_count",
];

/// Columns holding either RFC 3339 text or epoch seconds.
const TIMESTAMP_COLUMNS: &[&str] = &["created_at", "modified_at", "transaction_time", "release_time"];

/// Flag columns.
const BOOLEAN_COLUMNS: &[&str] = &["is_cert_valid", "is_nsfw"];

/// How a column's JSON cell is turned into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionRule {
    /// JSON number truncated to `i64`; anything else is a type mismatch
    Integer,
    /// RFC 3339 text becomes a timestamp, numbers stay integral epoch values
    Timestamp,
    /// Permissive boolean cast over booleans, numbers and boolean words
    Boolean,
    /// No conversion beyond the JSON-to-`Value` mapping
    #[default]
    Passthrough,
}

impl CoercionRule {
    fn expected(self) -> &'static str {
        match self {
            CoercionRule::Integer => "number",
            CoercionRule::Timestamp => "RFC 3339 string or number",
            CoercionRule::Boolean => "boolean, number or boolean string",
            CoercionRule::Passthrough => "any",
        }
    }
}

/// Mapping from exact column name to [`CoercionRule`].
///
/// Columns without an entry use [`CoercionRule::Passthrough`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionTable {
    rules: HashMap<String, CoercionRule>,
}

impl CoercionTable {
    /// A table with no rules; every column passes through.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The rules for the Chainquery schema (blocks, transactions, claims).
    pub fn chainquery() -> Self {
        let groups = [
            (INTEGER_COLUMNS, CoercionRule::Integer),
            (TIMESTAMP_COLUMNS, CoercionRule::Timestamp),
            (BOOLEAN_COLUMNS, CoercionRule::Boolean),
        ];

        let rules = groups
            .iter()
            .flat_map(|(names, rule)| names.iter().map(move |name| (name.to_string(), *rule)))
            .collect();

        Self { rules }
    }

    /// Adds or replaces the rule for a column.
    #[must_use]
    pub fn with_rule(mut self, column: impl Into<String>, rule: CoercionRule) -> Self {
        self.rules.insert(column.into(), rule);
        self
    }

    /// Rule applied to `column`.
    pub fn rule_for(&self, column: &str) -> CoercionRule {
        self.rules.get(column).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Converts one cell of `column`.
    ///
    /// `null` is returned as [`Value::Null`] for every column. Any string left
    /// after coercion is delivered as [`Value::Bytes`].
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::TypeMismatch` when the JSON shape does not fit
    /// an integer or boolean column or a number is outside the `i64` range, and `ConversionError::InvalidTimestamp`
    /// when a timestamp column holds text that is not RFC 3339.
    pub fn coerce(&self, column: &str, raw: &JsonScalar) -> Result<Value, ConversionError> {
        let rule = self.rule_for(column);
        let mismatch = || ConversionError::TypeMismatch {
            column: column.to_string(),
            expected: rule.expected(),
            found: raw.to_string(),
        };

        let value = match (rule, raw) {
            (_, JsonScalar::Null) => Value::Null,

            (CoercionRule::Integer, JsonScalar::Number(n)) => {
                Value::Int(number_to_i64(n).ok_or_else(mismatch)?)
            }
            (CoercionRule::Integer, _) => return Err(mismatch()),

            (CoercionRule::Timestamp, JsonScalar::String(s)) => {
                let ts = parse_rfc3339(s).map_err(|message| ConversionError::InvalidTimestamp {
                    column: column.to_string(),
                    value: s.clone(),
                    message,
                })?;
                Value::Timestamp(ts)
            }
            (CoercionRule::Timestamp, JsonScalar::Number(n)) => {
                Value::Int(number_to_i64(n).ok_or_else(mismatch)?)
            }
            (CoercionRule::Timestamp, JsonScalar::Bool(b)) => Value::Bool(*b),

            (CoercionRule::Boolean, JsonScalar::Bool(b)) => Value::Bool(*b),
            (CoercionRule::Boolean, JsonScalar::Number(n)) => {
                Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))
            }
            (CoercionRule::Boolean, JsonScalar::String(s)) => {
                Value::Bool(parse_bool_str(s).map_err(|_| mismatch())?)
            }

            (CoercionRule::Passthrough, JsonScalar::Number(n)) => match integral_number(n) {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            (CoercionRule::Passthrough, JsonScalar::String(s)) => Value::Bytes(s.clone().into_bytes()),
            (CoercionRule::Passthrough, JsonScalar::Bool(b)) => Value::Bool(*b),
        };

        Ok(value)
    }
}

impl Default for CoercionTable {
    fn default() -> Self {
        Self::chainquery()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn cell(value: serde_json::Value) -> JsonScalar {
        JsonScalar::from(value)
    }

    #[test]
    fn test_null_passes_through_for_every_rule() {
        let table = CoercionTable::chainquery();
        for column in ["nonce", "created_at", "is_nsfw", "hash"] {
            assert_eq!(table.coerce(column, &JsonScalar::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_integer_rule_truncates_numbers() {
        let table = CoercionTable::chainquery();
        assert_eq!(table.coerce("block_size", &cell(json!(1234.0))).unwrap(), Value::Int(1234));
        assert_eq!(table.coerce("nonce", &cell(json!(99.9))).unwrap(), Value::Int(99));
        assert_eq!(table.coerce("id", &cell(json!(7))).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_out_of_range_numbers_are_rejected() {
        let table = CoercionTable::chainquery();
        for (column, raw) in [
            ("nonce", json!(1e300)),
            ("block_size", json!(18446744073709551615u64)),
            ("block_time", json!(-1e19)),
        ] {
            assert!(
                matches!(table.coerce(column, &cell(raw)), Err(ConversionError::TypeMismatch { .. })),
                "{column}"
            );
        }
        assert_eq!(
            table.coerce("created_at", &cell(json!(1e300))),
            Err(ConversionError::TypeMismatch {
                column: "created_at".to_string(),
                expected: "RFC 3339 string or number",
                found: "1e300".to_string(),
            })
        );
    }

    #[test]
    fn test_integer_rule_rejects_non_numbers() {
        let table = CoercionTable::chainquery();
        let err = table.coerce("version", &cell(json!("12"))).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::TypeMismatch { ref column, .. } if column == "version"
        ));
        assert!(table.coerce("version", &cell(json!(true))).is_err());
    }

    #[test]
    fn test_timestamp_rule() {
        let table = CoercionTable::chainquery();
        assert_eq!(
            table.coerce("created_at", &cell(json!("2021-05-01T12:00:00Z"))).unwrap(),
            Value::Timestamp(Utc.with_ymd_and_hms(2021, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(
            table.coerce("transaction_time", &cell(json!(1620000000))).unwrap(),
            Value::Int(1620000000)
        );
        assert_eq!(table.coerce("release_time", &cell(json!(false))).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_timestamp_rule_rejects_bad_text() {
        let table = CoercionTable::chainquery();
        let err = table.coerce("modified_at", &cell(json!("yesterday"))).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_boolean_rule_truthy_and_falsy_forms_agree() {
        let table = CoercionTable::chainquery();
        for raw in [json!("1"), json!(1), json!(true), json!("TRUE"), json!(2.5)] {
            assert_eq!(table.coerce("is_nsfw", &cell(raw)).unwrap(), Value::Bool(true));
        }
        for raw in [json!("0"), json!(0), json!(false), json!("f"), json!(0.0)] {
            assert_eq!(table.coerce("is_cert_valid", &cell(raw)).unwrap(), Value::Bool(false));
        }
    }

    #[test]
    fn test_boolean_rule_rejects_unknown_words() {
        let table = CoercionTable::chainquery();
        let err = table.coerce("is_nsfw", &cell(json!("maybe"))).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_passthrough_columns() {
        let table = CoercionTable::chainquery();
        assert_eq!(table.coerce("height", &cell(json!(5))).unwrap(), Value::Int(5));
        assert_eq!(table.coerce("difficulty", &cell(json!(1.25))).unwrap(), Value::Float(1.25));
        assert_eq!(
            table.coerce("hash", &cell(json!("abc"))).unwrap(),
            Value::Bytes(b"abc".to_vec())
        );
        assert_eq!(table.coerce("flag", &cell(json!(true))).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_rule_lookup_is_case_sensitive() {
        let table = CoercionTable::chainquery();
        assert_eq!(table.rule_for("nonce"), CoercionRule::Integer);
        assert_eq!(table.rule_for("NONCE"), CoercionRule::Passthrough);
    }

    #[test]
    fn test_custom_rules() {
        let table = CoercionTable::empty().with_rule("height", CoercionRule::Integer);
        assert_eq!(table.len(), 1);
        assert_eq!(table.coerce("height", &cell(json!(5.0))).unwrap(), Value::Int(5));
        // no default rules in an empty table
        assert_eq!(table.coerce("nonce", &cell(json!(5.5))).unwrap(), Value::Float(5.5));
        assert!(CoercionTable::empty().is_empty());
    }

    #[test]
    fn test_default_is_chainquery() {
        assert_eq!(CoercionTable::default(), CoercionTable::chainquery());
        assert_eq!(CoercionTable::default().len(), 19);
    }
}
