//! Transport protocol trait and the wire envelope.
//!
//! The remote API answers every query with one JSON object:
//!
//! ```json
//! {"Success": true, "Error": "", "Data": [{"height": 5, "hash": "abc"}]}
//! ```
//!
//! Rows are decoded into insertion-ordered maps so a `SELECT *` result keeps
//! the server's column order.

use crate::error::QueryError;
use crate::types::JsonScalar;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

/// One result row as sent by the server, keyed by column name.
pub type Record = IndexMap<String, JsonScalar>;

/// Decoded response body of one query call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    /// Whether the server ran the query. Required: a body without it is not
    /// an envelope.
    #[serde(rename = "Success", alias = "success")]
    pub success: bool,

    /// Server-side error text; empty on success
    #[serde(rename = "Error", alias = "error", default, deserialize_with = "nullable")]
    pub error: String,

    /// Result rows
    #[serde(rename = "Data", alias = "data", default, deserialize_with = "nullable")]
    pub data: Vec<Record>,
}

/// Treats an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Envelope {
    /// Decodes a response body.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::MalformedResponse` if the body is not a valid
    /// envelope.
    pub fn from_slice(body: &[u8]) -> Result<Self, QueryError> {
        serde_json::from_slice(body).map_err(|e| QueryError::MalformedResponse(e.to_string()))
    }

    /// Converts an unsuccessful envelope into `QueryError::Rejected`.
    pub fn into_rows(self, sql: &str) -> Result<Vec<Record>, QueryError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(QueryError::Rejected {
                message: self.error,
                sql: sql.to_string(),
            })
        }
    }
}

/// Seam between a connection and the remote query service.
///
/// `HttpTransport` is the production implementation. The connection calls
/// `execute` once per query, after rate limiting.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Sends finished SQL text and returns the decoded envelope.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Network`, `QueryError::QueryFailed` or
    /// `QueryError::MalformedResponse` depending on where the call failed.
    async fn execute(&self, sql: &str) -> Result<Envelope, QueryError>;

    /// Base address of the service, for diagnostics.
    fn endpoint(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_envelope() {
        let env = Envelope::from_slice(
            br#"{"Success":true,"Error":"","Data":[{"height":5,"hash":"abc"},{"height":6,"hash":null}]}"#,
        )
        .unwrap();
        assert!(env.success);
        assert_eq!(env.data.len(), 2);
        let keys: Vec<&str> = env.data[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["height", "hash"]);
        assert!(env.data[1]["hash"].is_null());
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let env = Envelope::from_slice(br#"{"Success":true}"#).unwrap();
        assert!(env.error.is_empty());
        assert!(env.data.is_empty());

        let env = Envelope::from_slice(br#"{"success":true,"error":null,"data":null}"#).unwrap();
        assert!(env.data.is_empty());
    }

    #[test]
    fn test_missing_success_is_malformed() {
        for body in [
            &br#"{}"#[..],
            br#"{"error":"rate limit exceeded"}"#,
            br#"{"message":"upstream unavailable"}"#,
            br#"{"Data":[]}"#,
        ] {
            assert!(
                matches!(Envelope::from_slice(body), Err(QueryError::MalformedResponse(_))),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_key_order_follows_document() {
        let env = Envelope::from_slice(br#"{"Success":true,"Data":[{"zeta":1,"alpha":2,"mid":3}]}"#).unwrap();
        let keys: Vec<&str> = env.data[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            Envelope::from_slice(b"<html>oops</html>"),
            Err(QueryError::MalformedResponse(_))
        ));
        assert!(matches!(
            Envelope::from_slice(br#"{"Success":"yes"}"#),
            Err(QueryError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_rejected_envelope() {
        let env = Envelope::from_slice(br#"{"Success":false,"Error":"unknown column 'x'","Data":null}"#)
            .unwrap();
        match env.into_rows("SELECT x FROM block") {
            Err(QueryError::Rejected { message, sql }) => {
                assert_eq!(message, "unknown column 'x'");
                assert_eq!(sql, "SELECT x FROM block");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
