//! Connection parameters and connection string parsing.
//!
//! Two connection string forms are accepted:
//!
//! - a base URL: `https://chainquery.lbry.com?timeout=10&interval_ms=250`
//! - a MySQL-style DSN: `user:pass@tcp(chainquery.lbry.com)/chainquery?timeout=10s`
//!
//! In the DSN form only the address inside the parentheses is used; user,
//! password, network and database name are accepted and ignored. An address
//! without a scheme is reached over plain `http://`.
//!
//! Recognized options, in either form:
//!
//! | Option        | Meaning                                   | Default           |
//! |---------------|-------------------------------------------|-------------------|
//! | `timeout`     | HTTP request timeout (`30`, `500ms`, `1m30s`, `1h`) | 30 s |
//! | `interval_ms` | Minimum spacing between calls, in ms      | 200               |
//! | `user_agent`  | `User-Agent` header                       | `chainquery-rs/<version>` |

use crate::error::ConnectionError;
use crate::transport::rate_limit::DEFAULT_MIN_CALL_INTERVAL;
use log::debug;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default HTTP request timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent` header value.
pub fn default_user_agent() -> String {
    format!("chainquery-rs/{}", env!("CARGO_PKG_VERSION"))
}

/// Resolved settings for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Base URL of the service, without trailing slash
    pub server: String,
    /// Timeout for one HTTP round trip
    pub query_timeout: Duration,
    /// Minimum spacing between two calls; zero disables rate limiting
    pub min_call_interval: Duration,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl ConnectionParams {
    /// Parameters with defaults for the given server address.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConnectionString` if the address is
    /// not a usable HTTP(S) URL.
    pub fn new(server: impl Into<String>) -> Result<Self, ConnectionError> {
        ConnectionBuilder::new().server(server).build()
    }

    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }
}

impl FromStr for ConnectionParams {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(invalid(s, "connection string is empty"));
        }

        let (server, options) = if has_http_scheme(input) {
            split_url(input)?
        } else {
            split_dsn(input)?
        };

        let mut builder = ConnectionBuilder::new().server(server);
        for (name, value) in options {
            builder = builder.option(&name, &value)?;
        }
        builder.build()
    }
}

impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}?timeout={}ms&interval_ms={}",
            self.server,
            self.query_timeout.as_millis(),
            self.min_call_interval.as_millis()
        )
    }
}

/// Builder for [`ConnectionParams`].
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    server: Option<String>,
    query_timeout: Duration,
    min_call_interval: Duration,
    user_agent: String,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self {
            server: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            min_call_interval: DEFAULT_MIN_CALL_INTERVAL,
            user_agent: default_user_agent(),
        }
    }

    /// Set the server base URL. A missing scheme defaults to `http://`.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Set the HTTP request timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the minimum interval between calls.
    pub fn min_call_interval(mut self, interval: Duration) -> Self {
        self.min_call_interval = interval;
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Applies one connection string option by name.
    ///
    /// Unknown options are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidParameter` if a known option has an
    /// unparseable value.
    pub fn option(self, name: &str, value: &str) -> Result<Self, ConnectionError> {
        let invalid_value = || ConnectionError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        };

        match name {
            "timeout" => {
                let timeout = parse_duration(value).ok_or_else(invalid_value)?;
                if timeout.is_zero() {
                    return Err(invalid_value());
                }
                Ok(self.query_timeout(timeout))
            }
            "interval_ms" => {
                let ms: u64 = value.trim().parse().map_err(|_| invalid_value())?;
                Ok(self.min_call_interval(Duration::from_millis(ms)))
            }
            "user_agent" => Ok(self.user_agent(value)),
            other => {
                debug!("[CQ_CONN] Ignoring unknown connection option '{other}'");
                Ok(self)
            }
        }
    }

    /// Build the connection parameters.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConnectionString` if no server was
    /// set or it is not an HTTP(S) URL.
    pub fn build(self) -> Result<ConnectionParams, ConnectionError> {
        let raw = self
            .server
            .ok_or_else(|| invalid("", "server address is required"))?;
        let server = normalize_server(&raw)?;

        Ok(ConnectionParams {
            server,
            query_timeout: self.query_timeout,
            min_call_interval: self.min_call_interval,
            user_agent: self.user_agent,
        })
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(input: &str, message: impl Into<String>) -> ConnectionError {
    ConnectionError::InvalidConnectionString {
        input: input.to_string(),
        message: message.into(),
    }
}

fn has_http_scheme(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Validates a server address and returns it without query, fragment or
/// trailing slash.
fn normalize_server(raw: &str) -> Result<String, ConnectionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(raw, "server address is empty"));
    }

    let with_scheme = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(invalid(raw, "only http and https servers are supported"));
    } else {
        format!("http://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| invalid(raw, e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(raw, "server address has no host"));
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Splits a base URL into the server and its query string options.
fn split_url(input: &str) -> Result<(String, Vec<(String, String)>), ConnectionError> {
    let url = Url::parse(input).map_err(|e| invalid(input, e.to_string()))?;
    let options = url.query_pairs().into_owned().collect();
    Ok((input.to_string(), options))
}

/// Splits a DSN `[user[:password]@][net[(addr)]]/dbname[?options]`.
fn split_dsn(input: &str) -> Result<(String, Vec<(String, String)>), ConnectionError> {
    // the address may itself contain '/', so look for the separator after ')'
    let search_from = input.rfind(')').unwrap_or(0);
    let slash = input[search_from..]
        .find('/')
        .map(|offset| search_from + offset)
        .ok_or_else(|| invalid(input, "missing '/' before the database name"))?;

    let (head, tail) = (&input[..slash], &input[slash + 1..]);

    let net_addr = head.rsplit_once('@').map_or(head, |(_, rest)| rest);
    let addr = match net_addr.find('(') {
        Some(open) if net_addr.ends_with(')') => &net_addr[open + 1..net_addr.len() - 1],
        Some(_) => return Err(invalid(input, "unterminated address, expected ')'")),
        None => "",
    };
    if addr.trim().is_empty() {
        return Err(invalid(input, "missing server address, expected net(addr)"));
    }

    let options = match tail.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
        None => Vec::new(),
    };

    Ok((addr.to_string(), options))
}

/// Parses a timeout. A bare number is seconds (`30`, `1.5`); otherwise a
/// sequence of number-unit pairs as in Go's `time.ParseDuration` (`500ms`,
/// `1m30s`, `1h`), with units `ns`, `us`, `ms`, `s`, `m` and `h`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let mut rest = value.strip_prefix('+').unwrap_or(value);
    if rest.is_empty() {
        return None;
    }

    let mut total = 0.0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let (multiplier, divisor) = match &rest[..unit_len] {
            "ns" => (1.0, 1e9),
            "us" | "\u{b5}s" | "\u{3bc}s" => (1.0, 1e6),
            "ms" => (1.0, 1e3),
            "s" => (1.0, 1.0),
            "m" => (60.0, 1.0),
            "h" => (3600.0, 1.0),
            _ => return None,
        };
        total += number * multiplier / divisor;
        rest = &rest[unit_len..];
    }

    Duration::try_from_secs_f64(total).ok()
}
