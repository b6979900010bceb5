//! Row cursor over a buffered query result.

use crate::error::QueryError;
use crate::query::columns::ColumnPlan;
use crate::transport::protocol::Record;
use crate::types::{CoercionTable, JsonScalar, Value};
use std::sync::Arc;

static NULL_CELL: JsonScalar = JsonScalar::Null;

/// Result of one query execution.
///
/// All rows arrive in one response and are buffered; cells are coerced when
/// a row is read. Reading past the last row signals end-of-data, not an
/// error. A coercion failure closes the cursor.
pub struct Rows {
    columns: Arc<[String]>,
    data: Vec<Record>,
    position: usize,
    coercion: Arc<CoercionTable>,
    sql: String,
}

impl Rows {
    /// Wraps raw rows with the statement's column plan.
    ///
    /// An unresolved plan takes its columns from the keys of the first row,
    /// in the order the server sent them.
    pub(crate) fn new(
        plan: &ColumnPlan,
        data: Vec<Record>,
        coercion: Arc<CoercionTable>,
        sql: String,
    ) -> Self {
        let columns: Vec<String> = match plan {
            ColumnPlan::Fixed(columns) => columns.clone(),
            ColumnPlan::Unresolved => data
                .first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default(),
        };

        Self {
            columns: columns.into(),
            data,
            position: 0,
            coercion,
            sql,
        }
    }

    /// Column names, in the order values are delivered.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Total number of rows in the result.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Rows not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// The SQL text that was sent, with parameters substituted.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Reads the next row into `dest`, one slot per column.
    ///
    /// Returns `Ok(false)` once all rows have been read.
    ///
    /// # Errors
    ///
    /// - `QueryError::ColumnCountMismatch` if `dest` does not have one slot
    ///   per column
    /// - `QueryError::Conversion` if a cell does not fit its column's rule;
    ///   the cursor is closed afterwards
    pub fn next_into(&mut self, dest: &mut [Value]) -> Result<bool, QueryError> {
        let Some(row) = self.data.get(self.position) else {
            return Ok(false);
        };

        if dest.len() != self.columns.len() {
            return Err(QueryError::ColumnCountMismatch {
                columns: self.columns.len(),
                requested: dest.len(),
            });
        }

        for (slot, column) in dest.iter_mut().zip(self.columns.iter()) {
            match self.coercion.coerce(column, lookup(row, column)) {
                Ok(value) => *slot = value,
                Err(e) => {
                    self.close();
                    return Err(e.into());
                }
            }
        }

        self.position += 1;
        Ok(true)
    }

    /// Reads the next row as an owned [`Row`].
    pub fn next_row(&mut self) -> Option<Result<Row, QueryError>> {
        if self.remaining() == 0 {
            return None;
        }

        let mut values = vec![Value::Null; self.columns.len()];
        match self.next_into(&mut values) {
            Ok(true) => Some(Ok(Row {
                columns: Arc::clone(&self.columns),
                values,
            })),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }

    /// Releases the buffered rows. Later reads return end-of-data.
    pub fn close(&mut self) {
        self.data.clear();
        self.position = 0;
    }
}

impl Iterator for Rows {
    type Item = Result<Row, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("columns", &self.columns)
            .field("rows", &self.data.len())
            .field("position", &self.position)
            .field("sql", &self.sql)
            .finish()
    }
}

/// Cell for `column`; exact key first, then an ASCII case-insensitive match.
/// Absent cells read as null.
fn lookup<'a>(row: &'a Record, column: &str) -> &'a JsonScalar {
    row.get(column)
        .or_else(|| {
            row.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(column))
                .map(|(_, cell)| cell)
        })
        .unwrap_or(&NULL_CELL)
}

/// One coerced result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
