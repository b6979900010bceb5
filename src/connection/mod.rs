//! Connection configuration for the Chainquery SQL API.
//!
//! This module provides connection string parsing and the parameter builder
//! used by `Driver::open` and `Connection::builder`.
//!

pub mod params;

pub use params::{ConnectionBuilder, ConnectionParams, DEFAULT_QUERY_TIMEOUT};
