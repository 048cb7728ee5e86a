//! The narrow expression and subquery seams consumed by the
//! index-condition core.
//!
//! The planner sees scalar expressions and subqueries as capability
//! sets, not as a node hierarchy: evaluate, serialize to SQL,
//! classify under a visitor. Everything else about the expression
//! tree stays opaque.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use shardsql_error::{ShardError, ShardResult};
use shardsql_types::SqlValue;

use crate::session::Session;

/// Classification probes an expression must answer.
///
/// Only [`ExpressionVisitor::Evaluatable`] gates index-condition
/// binding; the others are carried for the planner's other passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionVisitor {
    /// All inputs are constants, bound parameters, or correlated
    /// outer references already materialized.
    Evaluatable,
    /// Same value for the same inputs, always.
    Deterministic,
    /// No dependency on any table of the current query.
    Independent,
}

/// A scalar expression node, opaque to the planner core.
pub trait Expression: Send + Sync {
    /// Evaluate to a value under the session.
    ///
    /// Implementations must observe the session cancel flag before
    /// doing work.
    fn value(&self, session: &Session) -> ShardResult<SqlValue>;

    /// SQL text of this expression.
    fn sql(&self) -> String;

    /// Whether the given property holds for this node and every input.
    fn is_everything(&self, visitor: ExpressionVisitor) -> bool;
}

impl fmt::Debug for dyn Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self.sql())
    }
}

/// A subquery handle producing a relation.
pub trait Query: Send + Sync {
    /// Execute and materialize at most `max_rows` rows; 0 means
    /// unbounded. May suspend on I/O to data nodes.
    fn execute(&self, session: &Session, max_rows: usize) -> ShardResult<QueryResult>;

    /// SQL text of the chosen plan, for explain output.
    fn plan_sql(&self) -> String;

    /// Whether the given property holds for the whole subquery.
    fn is_everything(&self, visitor: ExpressionVisitor) -> bool;
}

impl fmt::Debug for dyn Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query({})", self.plan_sql())
    }
}

/// A materialized relation returned by a subquery.
///
/// Rows carry no distinctness or ordering guarantee, and need not be
/// of uniform column type; callers that need the sorted-distinct
/// property of IN-list snapshots must not assume it here.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    column_count: usize,
    rows: Vec<Vec<SqlValue>>,
}

impl QueryResult {
    /// Build a result from rows. Every row must have `column_count`
    /// values; extra or missing values are a caller bug and are kept
    /// as-is (the planner never indexes past a row's end).
    #[must_use]
    pub fn new(column_count: usize, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { column_count, rows }
    }

    /// Number of columns per row.
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.column_count
    }

    /// Number of materialized rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the rows in materialization order.
    pub fn rows(&self) -> impl Iterator<Item = &[SqlValue]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Consume into the raw row vector.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<SqlValue>> {
        self.rows
    }
}

/// A constant expression wrapping one value.
#[derive(Debug, Clone)]
pub struct ValueExpression {
    value: SqlValue,
}

impl ValueExpression {
    /// Wrap a value.
    #[must_use]
    pub const fn new(value: SqlValue) -> Self {
        Self { value }
    }

    /// Boxed-arc convenience for building condition lists.
    #[must_use]
    pub fn arc(value: SqlValue) -> Arc<dyn Expression> {
        Arc::new(Self::new(value))
    }
}

impl Expression for ValueExpression {
    fn value(&self, session: &Session) -> ShardResult<SqlValue> {
        session.check_cancelled()?;
        Ok(self.value.clone())
    }

    fn sql(&self) -> String {
        self.value.sql_literal()
    }

    fn is_everything(&self, _visitor: ExpressionVisitor) -> bool {
        true
    }
}

/// A positional bind parameter (`?1`, `?2`, …).
///
/// Unbound parameters are legal during planning: they are simply not
/// evaluatable yet, and conditions over them stay residual filters
/// until binding happens.
#[derive(Debug)]
pub struct Parameter {
    index: usize,
    value: RwLock<Option<SqlValue>>,
}

impl Parameter {
    /// Create an unbound parameter with a 1-based position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            value: RwLock::new(None),
        }
    }

    /// 1-based position of this parameter.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Bind a value; rebinding overwrites.
    pub fn bind(&self, value: SqlValue) {
        *self.value.write() = Some(value);
    }

    /// Drop the bound value.
    pub fn unbind(&self) {
        *self.value.write() = None;
    }
}

impl Expression for Parameter {
    fn value(&self, session: &Session) -> ShardResult<SqlValue> {
        session.check_cancelled()?;
        self.value
            .read()
            .clone()
            .ok_or(ShardError::UnboundParameter { index: self.index })
    }

    fn sql(&self) -> String {
        format!("?{}", self.index)
    }

    fn is_everything(&self, visitor: ExpressionVisitor) -> bool {
        match visitor {
            ExpressionVisitor::Evaluatable => self.value.read().is_some(),
            ExpressionVisitor::Deterministic | ExpressionVisitor::Independent => true,
        }
    }
}
