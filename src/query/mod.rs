//! Statement preparation and result handling.
//!
//! # Overview
//!
//! The query module is organized into:
//! - `columns` - Output column extraction from the SELECT clause
//! - `interpolate` - Client-side `?` parameter substitution
//! - `prepared` - Prepared statements (parsed templates)
//! - `results` - Row cursor with per-column coercion
//!

pub mod columns;
pub mod interpolate;
pub mod prepared;
pub mod results;

// Re-export commonly used types
pub use columns::{extract_select_columns, ColumnPlan};
pub use interpolate::{interpolate, placeholder_count, Parameter};
pub use prepared::PreparedStatement;
pub use results::{Row, Rows};
