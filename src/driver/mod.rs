//! Driver entry points.
//!
//! - `Driver` - Named driver value; opens a `Database` from a connection string
//! - `Database` - Parsed connection settings; hands out `Connection`s
//! - `connection` - The `Connection` itself
//!

pub mod connection;

pub use connection::{Connection, ConnectionBuilder};

use crate::connection::params::ConnectionParams;
use crate::error::ConnectionError;
use crate::transport::HttpTransport;
use crate::types::CoercionTable;
use std::sync::Arc;

/// Name the driver is known by.
pub const DRIVER_NAME: &str = "chainquery";

/// Driver for the Chainquery SQL API.
///
/// # Example
///
/// ```no_run
/// use chainquery_rs::Driver;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let driver = Driver::new();
/// let database = driver.open("https://chainquery.lbry.com")?;
/// let connection = database.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Driver;

impl Driver {
    pub fn new() -> Self {
        Driver
    }

    /// Driver name, `"chainquery"`.
    pub fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    /// Crate version.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn vendor(&self) -> &'static str {
        "LBRY Chainquery"
    }

    pub fn description(&self) -> &'static str {
        env!("CARGO_PKG_DESCRIPTION")
    }

    /// Parse a connection string into a `Database`.
    ///
    /// # Arguments
    ///
    /// * `connection_string` - Base URL or MySQL-style DSN
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the connection string is invalid.
    pub fn open(&self, connection_string: &str) -> Result<Database, ConnectionError> {
        let params: ConnectionParams = connection_string.parse()?;
        Ok(Database {
            connection_string: connection_string.to_string(),
            params,
            coercion: CoercionTable::chainquery(),
        })
    }
}

/// A configured remote database. Each `connect` creates an independent
/// connection with its own HTTP client and rate limiter.
#[derive(Debug, Clone)]
pub struct Database {
    connection_string: String,
    params: ConnectionParams,
    coercion: CoercionTable,
}

impl Database {
    /// Replace the column coercion rules used by new connections.
    #[must_use]
    pub fn with_coercion_table(mut self, coercion: CoercionTable) -> Self {
        self.coercion = coercion;
        self
    }

    /// Open a connection.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the HTTP client cannot be built.
    pub async fn connect(&self) -> Result<Connection, ConnectionError> {
        let transport = HttpTransport::new(&self.params)?;
        Ok(Connection::with_transport(
            self.params.clone(),
            Arc::new(transport),
            self.coercion.clone(),
        ))
    }

    /// The connection string this database was opened with.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_driver_metadata() {
        let driver = Driver::new();
        assert_eq!(driver.name(), "chainquery");
        assert_eq!(driver.version(), env!("CARGO_PKG_VERSION"));
        assert!(!driver.vendor().is_empty());
        assert!(!driver.description().is_empty());
    }

    #[test]
    fn test_open_parses_connection_string() {
        let database = Driver::new()
            .open("user@tcp(chainquery.lbry.com)/chainquery?timeout=15")
            .unwrap();
        assert_eq!(
            database.connection_string(),
            "user@tcp(chainquery.lbry.com)/chainquery?timeout=15"
        );
        assert_eq!(database.params().server, "http://chainquery.lbry.com");
        assert_eq!(database.params().query_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_open_rejects_invalid_connection_string() {
        assert!(matches!(
            Driver::new().open("no server here"),
            Err(ConnectionError::InvalidConnectionString { .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_creates_independent_connections() {
        let database = Driver::new()
            .open("http://localhost:6300")
            .unwrap()
            .with_coercion_table(CoercionTable::empty());

        let first = database.connect().await.unwrap();
        let second = database.connect().await.unwrap();
        first.close();

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert!(second.coercion_table().is_empty());
        assert_eq!(second.server(), "http://localhost:6300");
    }
}
