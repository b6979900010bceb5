//! Prepared statements.
//!
//! Preparing a statement never contacts the server: the SQL is parsed once to
//! find its output columns and kept as a template. Each execution renders the
//! template with a fresh set of parameters.

use crate::error::QueryError;
use crate::query::columns::{extract_select_columns, ColumnPlan};
use crate::query::interpolate::{interpolate, placeholder_count, Parameter};

/// A parsed SELECT template with its output column plan.
///
/// Created by `Connection::prepare` and executed with
/// `Connection::query_prepared`. A statement can be executed any number of
/// times until it is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    sql: String,
    plan: ColumnPlan,
    placeholders: usize,
    closed: bool,
}

impl PreparedStatement {
    /// Parses `sql` and determines its output columns.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::ParseError` or `QueryError::ColumnExtraction` if
    /// the column plan cannot be determined.
    pub fn new(sql: impl Into<String>) -> Result<Self, QueryError> {
        let sql = sql.into();
        let plan = extract_select_columns(&sql)?;
        let placeholders = placeholder_count(&sql);
        Ok(Self {
            sql,
            plan,
            placeholders,
            closed: false,
        })
    }

    /// The SQL template as given to `prepare`.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn column_plan(&self) -> &ColumnPlan {
        &self.plan
    }

    /// Number of `?` placeholders each execution must bind.
    pub fn parameter_count(&self) -> usize {
        self.placeholders
    }

    /// Renders the final SQL text for one execution.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::StatementClosed` for a closed statement and
    /// `QueryError::Interpolation` if the parameters do not fit the template.
    pub fn build_sql(&self, params: &[Parameter]) -> Result<String, QueryError> {
        if self.closed {
            return Err(QueryError::StatementClosed);
        }
        Ok(interpolate(&self.sql, params)?)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the statement. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.closed = true;
    }
}
