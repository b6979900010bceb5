//! Output column extraction for SELECT statements.
//!
//! The remote API returns each row as a JSON object, which has no column
//! order. The order a caller expects is the order of the projection list, so
//! it is read from the SQL text at prepare time.

use crate::error::QueryError;
use sqlparser::ast::{Expr, SelectItem, SetExpr, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

/// Output columns of a prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPlan {
    /// Lower-cased column names in projection order
    Fixed(Vec<String>),
    /// `SELECT *`: columns are taken from the first returned row
    Unresolved,
}

impl ColumnPlan {
    /// Column names, or `None` when the plan is unresolved.
    pub fn columns(&self) -> Option<&[String]> {
        match self {
            ColumnPlan::Fixed(columns) => Some(columns),
            ColumnPlan::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ColumnPlan::Fixed(_))
    }
}

/// Extracts the output column names of a single SELECT statement.
///
/// Aliased expressions contribute their alias, bare column references
/// (`col`, `t.col`) their final identifier. A wildcard anywhere in the
/// projection makes the whole plan [`ColumnPlan::Unresolved`].
///
/// # Errors
///
/// - `QueryError::ParseError` if the SQL does not parse, holds more than one
///   statement, or is not a plain SELECT
/// - `QueryError::ColumnExtraction` for an unaliased expression that is not a
///   column reference, such as `COUNT(*)` or `a + 1`
pub fn extract_select_columns(sql: &str) -> Result<ColumnPlan, QueryError> {
    let statements = Parser::parse_sql(&MySqlDialect {}, sql)
        .map_err(|e| QueryError::ParseError(e.to_string()))?;

    let statement = match statements.as_slice() {
        [statement] => statement,
        [] => return Err(QueryError::ParseError("empty statement".to_string())),
        many => {
            return Err(QueryError::ParseError(format!(
                "expected a single statement, found {}",
                many.len()
            )))
        }
    };

    let Statement::Query(query) = statement else {
        return Err(QueryError::ParseError(
            "only SELECT statements are supported".to_string(),
        ));
    };

    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select,
        other => {
            return Err(QueryError::ParseError(format!(
                "only plain SELECT statements are supported, found '{other}'"
            )))
        }
    };

    let mut columns = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        let name = match item {
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
                return Ok(ColumnPlan::Unresolved)
            }
            SelectItem::ExprWithAlias { alias, .. } => alias.value.clone(),
            SelectItem::UnnamedExpr(expr) => column_reference_name(expr)?,
            #[allow(unreachable_patterns)]
            other => {
                return Err(QueryError::ColumnExtraction {
                    expr: other.to_string(),
                })
            }
        };
        columns.push(name.to_lowercase());
    }

    Ok(ColumnPlan::Fixed(columns))
}

fn column_reference_name(expr: &Expr) -> Result<String, QueryError> {
    let name = match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(idents) => idents.last().map(|ident| ident.value.clone()),
        _ => None,
    };

    name.ok_or_else(|| QueryError::ColumnExtraction {
        expr: expr.to_string(),
    })
}
