//! Error types for chainquery-rs.
//!
//! Errors are layered the same way the driver is: connection setup,
//! query execution, parameter interpolation and cell conversion each have
//! their own enum, and [`ChainqueryError`] wraps all of them for callers
//! that only want one error type.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum ChainqueryError {
    /// Connection setup failed
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Query preparation or execution failed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// A result cell could not be converted
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),
}

/// Errors raised while parsing connection strings or building the HTTP client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The connection string is neither a base URL nor a DSN
    #[error("Invalid connection string '{input}': {message}")]
    InvalidConnectionString { input: String, message: String },

    /// A connection option has an invalid value
    #[error("Invalid value for connection parameter '{name}': {value}")]
    InvalidParameter { name: String, value: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuildFailed(String),
}

/// Errors raised by `Connection`, `PreparedStatement` and `Rows`.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The SQL text could not be parsed, or is not a single SELECT
    #[error("SQL parse error: {0}")]
    ParseError(String),

    /// A projection item is neither aliased nor a bare column reference
    #[error("Cannot determine column name for select expression '{expr}'; add an alias")]
    ColumnExtraction { expr: String },

    /// Parameter interpolation failed
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// The remote service could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The remote service answered with a non-2xx status
    #[error("request failed with [{status}] with query [{sql}] url[{url}]")]
    QueryFailed {
        status: u16,
        sql: String,
        url: String,
    },

    /// The response body is not a valid result envelope
    #[error("Malformed response body: {0}")]
    MalformedResponse(String),

    /// The remote service reported an unsuccessful query
    #[error("Query rejected by server: {message} (query [{sql}])")]
    Rejected { message: String, sql: String },

    /// A cell could not be coerced to its column type
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The caller asked for more values per row than the result has columns
    #[error("Row has {columns} columns but {requested} destination slots were given")]
    ColumnCountMismatch { columns: usize, requested: usize },

    /// Operation is not available on a read-only HTTP API
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The prepared statement was closed
    #[error("Statement is closed")]
    StatementClosed,

    /// The connection was closed
    #[error("Connection is closed")]
    ConnectionClosed,
}

/// Errors raised while substituting bound parameters into SQL text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// Placeholder count and parameter count differ
    #[error("Query has {placeholders} placeholders but {parameters} parameters were bound")]
    ArityMismatch {
        placeholders: usize,
        parameters: usize,
    },

    /// The parameter value has no SQL literal form
    #[error("Unsupported parameter at position {index}: {message}")]
    UnsupportedParameter { index: usize, message: String },
}

/// Errors raised while coercing a JSON cell to its column's type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The JSON shape does not fit the column's rule
    #[error("Type mismatch in column '{column}': expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// A timestamp column holds a string that is not RFC 3339
    #[error("Invalid timestamp in column '{column}': '{value}' ({message})")]
    InvalidTimestamp {
        column: String,
        value: String,
        message: String,
    },
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        QueryError::Network(err.to_string())
    }
}
