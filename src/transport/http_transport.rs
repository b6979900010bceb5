//! HTTP transport for the Chainquery SQL API.
//!
//! Every query is a single request:
//!
//! ```text
//! GET {server}/api/sql?query=<url-encoded SQL>
//! ```
//!
//! The response body is a JSON [`Envelope`]. One `reqwest::Client` is built
//! per connection and reused for all statements, so keep-alive connections
//! are pooled by the client.

use async_trait::async_trait;
use log::{debug, warn};
use std::time::Instant;
use url::Url;

use crate::connection::params::ConnectionParams;
use crate::error::{ConnectionError, QueryError};
use crate::transport::protocol::{Envelope, QueryTransport};

/// Path of the SQL endpoint, relative to the server base URL.
pub const SQL_API_PATH: &str = "/api/sql";

/// Name of the query string parameter carrying the SQL text.
pub const QUERY_PARAM: &str = "query";

/// Longest SQL prefix written to the log.
const SQL_PREVIEW_CHARS: usize = 80;

/// Production [`QueryTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    server: String,
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds the HTTP client for a connection.
    ///
    /// # Arguments
    ///
    /// * `params` - Connection parameters; `server`, `query_timeout` and
    ///   `user_agent` are used here
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidConnectionString` if the server address does
    ///   not form a valid URL
    /// - `ConnectionError::ClientBuildFailed` if the TLS backend cannot be
    ///   initialized
    pub fn new(params: &ConnectionParams) -> Result<Self, ConnectionError> {
        let endpoint = Url::parse(&format!("{}{}", params.server, SQL_API_PATH)).map_err(|e| {
            ConnectionError::InvalidConnectionString {
                input: params.server.clone(),
                message: e.to_string(),
            }
        })?;

        let client = reqwest::Client::builder()
            .timeout(params.query_timeout)
            .user_agent(params.user_agent.as_str())
            .build()
            .map_err(|e| ConnectionError::ClientBuildFailed(e.to_string()))?;

        debug!(
            "[CQ_HTTP] Transport ready: endpoint={} timeout_ms={}",
            endpoint,
            params.query_timeout.as_millis()
        );

        Ok(Self {
            server: params.server.clone(),
            endpoint,
            client,
        })
    }

    /// Full request URL for `sql`.
    pub fn request_url(&self, sql: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(QUERY_PARAM, sql);
        url
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn execute(&self, sql: &str) -> Result<Envelope, QueryError> {
        let url = self.request_url(sql);
        debug!(
            "[CQ_HTTP] Sending GET for \"{}\" (len={})",
            preview(sql),
            sql.len()
        );

        let start = Instant::now();
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "[CQ_HTTP] Request failed: {} duration_ms={}",
                    e,
                    start.elapsed().as_millis()
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        let http_duration_ms = start.elapsed().as_millis();
        debug!(
            "[CQ_HTTP] Response received: status={} duration_ms={}",
            status, http_duration_ms
        );

        if !status.is_success() {
            warn!(
                "[CQ_HTTP] Server error: status={} query=\"{}\"",
                status,
                preview(sql)
            );
            return Err(QueryError::QueryFailed {
                status: status.as_u16(),
                sql: sql.to_string(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        let envelope = Envelope::from_slice(&body).map_err(|e| {
            warn!(
                "[CQ_HTTP] Undecodable body ({} bytes) for \"{}\": {}",
                body.len(),
                preview(sql),
                e
            );
            e
        })?;

        debug!(
            "[CQ_HTTP] Decoded envelope: success={} rows={} total_ms={}",
            envelope.success,
            envelope.data.len(),
            start.elapsed().as_millis()
        );
        Ok(envelope)
    }

    fn endpoint(&self) -> &str {
        &self.server
    }
}

/// First line-folded characters of `sql`, for log output.
fn preview(sql: &str) -> String {
    let mut out: String = sql
        .chars()
        .take(SQL_PREVIEW_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if sql.chars().nth(SQL_PREVIEW_CHARS).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn params(server: &str) -> ConnectionParams {
        ConnectionParams::builder().server(server).build().unwrap()
    }

    #[test]
    fn test_request_url_encodes_query() {
        let transport = HttpTransport::new(&params("https://chainquery.lbry.com")).unwrap();
        let url = transport.request_url("SELECT * FROM claim WHERE name = 'a&b' AND id = 1");
        assert_eq!(url.path(), "/api/sql");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![(
                "query".to_string(),
                "SELECT * FROM claim WHERE name = 'a&b' AND id = 1".to_string()
            )]
        );
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_request_url_keeps_base_path() {
        let transport = HttpTransport::new(&params("http://localhost:6300/chainquery")).unwrap();
        let url = transport.request_url("SELECT 1 AS one");
        assert_eq!(url.path(), "/chainquery/api/sql");
        assert_eq!(transport.endpoint(), "http://localhost:6300/chainquery");
    }

    #[test]
    fn test_invalid_server_is_rejected() {
        let mut p = params("http://localhost");
        p.server = "not a url".to_string();
        assert!(matches!(
            HttpTransport::new(&p),
            Err(ConnectionError::InvalidConnectionString { .. })
        ));
    }

    #[test]
    fn test_preview_truncates_and_folds_lines() {
        assert_eq!(preview("SELECT 1\nFROM t"), "SELECT 1 FROM t");
        let long = "x".repeat(100);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.len(), SQL_PREVIEW_CHARS + 3);
        // multibyte characters are never split
        assert_eq!(preview(&"é".repeat(10)), "é".repeat(10));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let p = ConnectionParams::builder()
            .server("http://127.0.0.1:9")
            .query_timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let transport = HttpTransport::new(&p).unwrap();
        assert!(matches!(
            transport.execute("SELECT 1 AS one").await,
            Err(QueryError::Network(_))
        ));
    }
}
