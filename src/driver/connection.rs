//! Connection implementation.
//!
//! This module provides the `Connection` type, the handle callers use to
//! prepare and run read-only queries against the remote SQL API.
//!
//! A connection owns one transport (one pooled HTTP client), one rate limiter
//! and one coercion table. Clones share all three, so every statement issued
//! through any clone is spaced by the same limiter.

use crate::connection::params::{ConnectionBuilder as ParamsBuilder, ConnectionParams};
use crate::error::{ChainqueryError, ConnectionError, QueryError};
use crate::query::columns::ColumnPlan;
use crate::query::interpolate::Parameter;
use crate::query::prepared::PreparedStatement;
use crate::query::results::Rows;
use crate::transport::protocol::{Envelope, QueryTransport};
use crate::transport::rate_limit::RateLimiter;
use crate::transport::HttpTransport;
use crate::types::CoercionTable;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Global tokio runtime for blocking operations.
///
/// This runtime is lazily initialized on first use and is shared across
/// all `blocking_*` calls. Blocking calls must not be made from inside an
/// async context.
fn blocking_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime for blocking operations")
    })
}

/// Connection to the Chainquery SQL API.
///
/// # Example
///
/// ```no_run
/// use chainquery_rs::{Connection, Parameter};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connection = Connection::connect("https://chainquery.lbry.com").await?;
/// let stmt = connection.prepare("SELECT hash FROM block WHERE height = ?")?;
/// let mut rows = connection.query_prepared(&stmt, &[Parameter::Int(1)]).await?;
/// while let Some(row) = rows.next_row() {
///     println!("{:?}", row?.get("hash"));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Connection {
    /// Transport to the remote service (shared by clones)
    transport: Arc<dyn QueryTransport>,
    /// Call spacing for this connection
    limiter: Arc<RateLimiter>,
    /// Column coercion rules handed to every result
    coercion: Arc<CoercionTable>,
    /// Connection parameters
    params: ConnectionParams,
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Create a connection from connection parameters.
    ///
    /// No request is sent; the HTTP client is built and the rate limiter
    /// starts counting from now.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the HTTP client cannot be built.
    pub async fn from_params(params: ConnectionParams) -> Result<Self, ConnectionError> {
        let transport = HttpTransport::new(&params)?;
        Ok(Self::with_transport(
            params,
            Arc::new(transport),
            CoercionTable::chainquery(),
        ))
    }

    /// Create a connection over a custom transport.
    ///
    /// Only `min_call_interval` is taken from `params`; everything else is
    /// up to the transport.
    pub fn with_transport(
        params: ConnectionParams,
        transport: Arc<dyn QueryTransport>,
        coercion: CoercionTable,
    ) -> Self {
        debug!(
            "[CQ_CONN] Opened connection to {} (min interval {}ms)",
            transport.endpoint(),
            params.min_call_interval.as_millis()
        );
        Self {
            transport,
            limiter: Arc::new(RateLimiter::new(params.min_call_interval)),
            coercion: Arc::new(coercion),
            params,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Connect to a server given as a base URL or DSN.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the connection string is invalid.
    pub async fn connect(server: &str) -> Result<Self, ConnectionError> {
        let params: ConnectionParams = server.parse()?;
        Self::from_params(params).await
    }

    /// Create a builder for constructing a connection.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    // ========================================================================
    // Prepared Statement Methods
    // ========================================================================

    /// Create a prepared statement.
    ///
    /// The SQL is parsed locally to determine its output columns; the server
    /// is not contacted.
    ///
    /// # Arguments
    ///
    /// * `sql` - SELECT statement with parameter placeholders (?)
    ///
    /// # Errors
    ///
    /// - `QueryError::ConnectionClosed` if the connection was closed
    /// - `QueryError::ParseError` / `QueryError::ColumnExtraction` if the
    ///   column plan cannot be determined
    pub fn prepare(&self, sql: impl Into<String>) -> Result<PreparedStatement, QueryError> {
        self.ensure_open()?;
        PreparedStatement::new(sql)
    }

    /// Execute a prepared statement with bound parameters.
    ///
    /// # Arguments
    ///
    /// * `stmt` - Prepared statement to execute
    /// * `params` - One value per placeholder, in order
    ///
    /// # Returns
    ///
    /// A `Rows` cursor over the buffered result.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if interpolation, the HTTP call or envelope
    /// decoding fails, or the server rejects the query.
    pub async fn query_prepared(
        &self,
        stmt: &PreparedStatement,
        params: &[Parameter],
    ) -> Result<Rows, QueryError> {
        self.ensure_open()?;
        let sql = stmt.build_sql(params)?;
        self.fetch(stmt.column_plan(), sql).await
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Prepare and execute `sql` in one step.
    ///
    /// # Errors
    ///
    /// Same as [`prepare`](Self::prepare) and
    /// [`query_prepared`](Self::query_prepared).
    pub async fn query(&self, sql: &str, params: &[Parameter]) -> Result<Rows, QueryError> {
        let stmt = self.prepare(sql)?;
        self.query_prepared(&stmt, params).await
    }

    /// Execute SQL text as-is, without column extraction or interpolation.
    ///
    /// Columns are taken from the first returned row, so expressions such as
    /// `COUNT(*)` work without an alias.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if the HTTP call or envelope decoding fails, or
    /// the server rejects the query.
    pub async fn query_raw(&self, sql: &str) -> Result<Rows, QueryError> {
        self.ensure_open()?;
        self.fetch(&ColumnPlan::Unresolved, sql.to_string()).await
    }

    /// Write statements are not supported by the remote API.
    ///
    /// # Errors
    ///
    /// Always returns `QueryError::Unsupported`.
    pub async fn execute_update(&self, _sql: &str) -> Result<i64, QueryError> {
        self.ensure_open()?;
        Err(QueryError::Unsupported("write operations"))
    }

    // ========================================================================
    // Transaction Methods
    // ========================================================================

    /// Transactions are not supported by the remote API.
    ///
    /// # Errors
    ///
    /// Always returns `QueryError::Unsupported`.
    pub async fn begin_transaction(&self) -> Result<(), QueryError> {
        self.ensure_open()?;
        Err(QueryError::Unsupported("transactions"))
    }

    // ========================================================================
    // Blocking Wrappers
    // ========================================================================

    /// Connect to a server (blocking).
    ///
    /// Synchronous wrapper around [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the connection string is invalid.
    pub fn blocking_connect(server: &str) -> Result<Self, ConnectionError> {
        blocking_runtime().block_on(Self::connect(server))
    }

    /// Execute a prepared statement (blocking).
    ///
    /// Synchronous wrapper around [`query_prepared`](Self::query_prepared).
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if execution fails.
    pub fn blocking_query_prepared(
        &self,
        stmt: &PreparedStatement,
        params: &[Parameter],
    ) -> Result<Rows, QueryError> {
        blocking_runtime().block_on(self.query_prepared(stmt, params))
    }

    /// Prepare and execute `sql` (blocking).
    ///
    /// Synchronous wrapper around [`query`](Self::query).
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if preparation or execution fails.
    pub fn blocking_query(&self, sql: &str, params: &[Parameter]) -> Result<Rows, QueryError> {
        blocking_runtime().block_on(self.query(sql, params))
    }

    /// Execute SQL text as-is (blocking).
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if execution fails.
    pub fn blocking_query_raw(&self, sql: &str) -> Result<Rows, QueryError> {
        blocking_runtime().block_on(self.query_raw(sql))
    }

    // ========================================================================
    // Connection Information Methods
    // ========================================================================

    /// Get connection parameters.
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Base address of the remote service.
    pub fn server(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn coercion_table(&self) -> &CoercionTable {
        &self.coercion
    }

    /// Minimum spacing between calls on this connection.
    pub fn min_call_interval(&self) -> Duration {
        self.limiter.min_interval()
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the connection.
    ///
    /// Clones share the closed flag. Results already fetched stay readable.
    /// Closing twice is a no-op.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("[CQ_CONN] Closed connection to {}", self.transport.endpoint());
        }
    }

    // ========================================================================
    // Private Helper Methods
    // ========================================================================

    fn ensure_open(&self) -> Result<(), QueryError> {
        if self.is_closed() {
            Err(QueryError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    /// Rate-limited round trip producing a cursor.
    async fn fetch(&self, plan: &ColumnPlan, sql: String) -> Result<Rows, QueryError> {
        let envelope = self.execute_envelope(&sql).await?;
        let data = envelope.into_rows(&sql)?;
        debug!("[CQ_CONN] Query returned {} rows", data.len());
        Ok(Rows::new(plan, data, Arc::clone(&self.coercion), sql))
    }

    async fn execute_envelope(&self, sql: &str) -> Result<Envelope, QueryError> {
        self.limiter.throttle().await;
        self.transport.execute(sql).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("server", &self.transport.endpoint())
            .field("query_timeout", &self.params.query_timeout)
            .field("min_call_interval", &self.limiter.min_interval())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for creating Connection instances.
pub struct ConnectionBuilder {
    /// Connection parameters builder
    params_builder: ParamsBuilder,
    coercion: CoercionTable,
}

impl ConnectionBuilder {
    /// Create a new ConnectionBuilder.
    pub fn new() -> Self {
        Self {
            params_builder: ParamsBuilder::new(),
            coercion: CoercionTable::chainquery(),
        }
    }

    /// Set the server base URL.
    pub fn server(mut self, server: &str) -> Self {
        self.params_builder = self.params_builder.server(server);
        self
    }

    /// Set the HTTP request timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.params_builder = self.params_builder.query_timeout(timeout);
        self
    }

    /// Set the minimum interval between calls.
    pub fn min_call_interval(mut self, interval: Duration) -> Self {
        self.params_builder = self.params_builder.min_call_interval(interval);
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.params_builder = self.params_builder.user_agent(user_agent);
        self
    }

    /// Replace the column coercion rules.
    pub fn coercion_table(mut self, coercion: CoercionTable) -> Self {
        self.coercion = coercion;
        self
    }

    /// Build and connect.
    ///
    /// # Errors
    ///
    /// Returns `ChainqueryError` if the parameters are invalid or the HTTP
    /// client cannot be built.
    pub async fn connect(self) -> Result<Connection, ChainqueryError> {
        let params = self.params_builder.build()?;
        let transport = HttpTransport::new(&params)?;
        Ok(Connection::with_transport(
            params,
            Arc::new(transport),
            self.coercion,
        ))
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
