//! Result cell types and the column coercion rules.

mod coercion;
pub(crate) mod conversion;
mod value;

pub use coercion::{CoercionRule, CoercionTable};
pub use value::{JsonScalar, Value};
