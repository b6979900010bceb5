//! Transport layer for the remote SQL API.
//!
//! - `protocol` - The `QueryTransport` trait and the JSON result envelope
//! - `http_transport` - `reqwest`-based implementation
//! - `rate_limit` - Per-connection call spacing
//!

pub mod http_transport;
pub mod protocol;
pub mod rate_limit;

pub use http_transport::HttpTransport;
pub use protocol::{Envelope, QueryTransport, Record};
pub use rate_limit::{RateLimiter, DEFAULT_MIN_CALL_INTERVAL};
