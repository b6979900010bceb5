//! # chainquery-rs
//!
//! Read-only SQL driver for the Chainquery HTTP SQL API.
//!
//! Chainquery exposes the LBRY blockchain as a MySQL database behind a single
//! HTTP endpoint that takes SQL text and answers with JSON rows. This crate
//! puts a connection / prepared statement / rows interface in front of it:
//!
//! - **Column extraction**: output columns are read from the SELECT clause at
//!   prepare time, so rows come back in projection order
//! - **Parameter binding**: `?` placeholders are rendered as MySQL literals on
//!   the client
//! - **Type coercion**: loosely typed JSON cells are converted per column
//!   (integers, timestamps, flags)
//! - **Rate limiting**: calls on one connection are spaced at least 200 ms apart
//!
//! ## Query Example
//!
//! ```no_run
//! use chainquery_rs::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create driver and open database
//! let driver = Driver::new();
//! let database = driver.open("https://chainquery.lbry.com")?;
//!
//! // Connect to the database
//! let connection = database.connect().await?;
//!
//! // Prepare once, execute with parameters
//! let stmt = connection.prepare("SELECT height, hash FROM block WHERE height > ? LIMIT 5")?;
//! let rows = connection
//!     .query_prepared(&stmt, &[Parameter::Int(1_000_000)])
//!     .await?;
//!
//! for row in rows {
//!     let row = row?;
//!     println!("{:?} {:?}", row.get("height"), row.get("hash").and_then(Value::as_str));
//! }
//!
//! connection.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Blocking Example
//!
//! ```no_run
//! use chainquery_rs::*;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connection = Connection::blocking_connect("https://chainquery.lbry.com")?;
//! let mut rows = connection.blocking_query("SELECT * FROM block ORDER BY height DESC LIMIT 1", &[])?;
//!
//! let mut values = vec![Value::Null; rows.columns().len()];
//! while rows.next_into(&mut values)? {
//!     println!("{values:?}");
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod connection;
pub mod driver;
pub mod error;
pub mod query;
pub mod transport;
pub mod types;

// =============================================================================
// Driver Interface Types
// =============================================================================

/// Re-export driver and connection types.
pub use driver::{Connection, ConnectionBuilder, Database, Driver, DRIVER_NAME};

/// Re-export connection configuration.
pub use connection::ConnectionParams;

// =============================================================================
// Error Types
// =============================================================================

/// Re-export error types for convenient error handling.
pub use error::{ChainqueryError, ConnectionError, ConversionError, InterpolationError, QueryError};

// =============================================================================
// Type System
// =============================================================================

pub use types::{CoercionRule, CoercionTable, JsonScalar, Value};

// =============================================================================
// Query Execution Types
// =============================================================================

/// Query preparation and result handling types.
pub use query::{ColumnPlan, Parameter, PreparedStatement, Row, Rows};

// =============================================================================
// Transport Types
// =============================================================================

pub use transport::{Envelope, HttpTransport, QueryTransport, RateLimiter};

/// Connect to a server given as a base URL or MySQL-style DSN.
///
/// Shorthand for [`Connection::connect`].
///
/// # Errors
///
/// Returns `ConnectionError` if the connection string is invalid.
pub async fn connect(server: &str) -> Result<Connection, ConnectionError> {
    Connection::connect(server).await
}
