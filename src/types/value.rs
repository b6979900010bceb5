//! Cell values before and after coercion.

use crate::types::conversion::format_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// A JSON cell as decoded from the result envelope.
///
/// The remote service only ever sends scalars. Arrays and objects are kept
/// as their JSON text in [`JsonScalar::String`] so a row never fails to decode.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonScalar {
    Null,
    Number(serde_json::Number),
    String(String),
    Bool(bool),
}

impl JsonScalar {
    /// Short JSON type name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            JsonScalar::Null => "null",
            JsonScalar::Number(_) => "number",
            JsonScalar::String(_) => "string",
            JsonScalar::Bool(_) => "boolean",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonScalar::Null)
    }
}

impl From<serde_json::Value> for JsonScalar {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonScalar::Null,
            serde_json::Value::Bool(b) => JsonScalar::Bool(b),
            serde_json::Value::Number(n) => JsonScalar::Number(n),
            serde_json::Value::String(s) => JsonScalar::String(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                JsonScalar::String(nested.to_string())
            }
        }
    }
}

impl<'de> Deserialize<'de> for JsonScalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(JsonScalar::from)
    }
}

impl fmt::Display for JsonScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonScalar::Null => write!(f, "null"),
            JsonScalar::Number(n) => write!(f, "{n}"),
            JsonScalar::String(s) => write!(f, "{s:?}"),
            JsonScalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A typed result cell handed to callers by `Rows`.
///
/// Text is always delivered as [`Value::Bytes`]; use [`Value::as_str`] to
/// read it back as UTF-8.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer value. Floats are only accepted when they have no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Text value, if the cell holds valid UTF-8 bytes.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Timestamp(ts) => write!(f, "{}", format_rfc3339(ts)),
        }
    }
}
