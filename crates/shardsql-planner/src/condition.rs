//! Index conditions: one atomic predicate bound to one column,
//! annotated with a comparison operator.
//!
//! An index condition is made for each WHERE-clause predicate that
//! can potentially use an index. It does not belong to the expression
//! tree, but in general one expression maps to each condition. The
//! payload is a sum: a scalar right-hand side, an IN list, an IN
//! subquery, or the always-false contradiction. Exactly one is
//! present, enforced by construction.

use std::cmp::Ordering;
use std::sync::Arc;

use shardsql_error::{ShardError, ShardResult};
use shardsql_types::SqlValue;

use crate::catalog::{Column, TableKind};
use crate::explain::SqlBuilder;
use crate::expression::{Expression, ExpressionVisitor, Query, QueryResult};
use crate::session::Session;

/// Scalar comparison operators usable as index bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarOp {
    /// `col = expr`, NULL-unsafe.
    Equal,
    /// `col IS expr`.
    EqualNullSafe,
    /// `col > expr`.
    Bigger,
    /// `col >= expr`.
    BiggerEqual,
    /// `col < expr`.
    Smaller,
    /// `col <= expr`.
    SmallerEqual,
}

impl ScalarOp {
    /// The operator symbol used in explain SQL.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::EqualNullSafe => "IS",
            Self::Bigger => ">",
            Self::BiggerEqual => ">=",
            Self::Smaller => "<",
            Self::SmallerEqual => "<=",
        }
    }

    /// Whether this operator constrains the scan start.
    #[must_use]
    pub const fn is_start(self) -> bool {
        matches!(
            self,
            Self::Equal | Self::EqualNullSafe | Self::Bigger | Self::BiggerEqual
        )
    }

    /// Whether this operator constrains the scan end.
    #[must_use]
    pub const fn is_end(self) -> bool {
        matches!(
            self,
            Self::Equal | Self::EqualNullSafe | Self::Smaller | Self::SmallerEqual
        )
    }
}

/// Flat operator code of an index condition, scalar and IN variants
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `col = expr`.
    Equal,
    /// `col IS expr`.
    EqualNullSafe,
    /// `col > expr`.
    Bigger,
    /// `col >= expr`.
    BiggerEqual,
    /// `col < expr`.
    Smaller,
    /// `col <= expr`.
    SmallerEqual,
    /// `col IN (e1, …, en)`.
    InList,
    /// `col IN (subquery)`.
    InQuery,
    /// Contradiction; the predicate is always false.
    False,
}

impl From<ScalarOp> for Comparison {
    fn from(op: ScalarOp) -> Self {
        match op {
            ScalarOp::Equal => Self::Equal,
            ScalarOp::EqualNullSafe => Self::EqualNullSafe,
            ScalarOp::Bigger => Self::Bigger,
            ScalarOp::BiggerEqual => Self::BiggerEqual,
            ScalarOp::Smaller => Self::Smaller,
            ScalarOp::SmallerEqual => Self::SmallerEqual,
        }
    }
}

/// The payload of an index condition. Exactly one arm is ever
/// present; the column lives inside the arm so the always-false
/// singleton carries neither column nor expression.
#[derive(Clone)]
enum ConditionKind {
    AlwaysFalse,
    Scalar {
        column: Column,
        op: ScalarOp,
        expression: Arc<dyn Expression>,
    },
    InList {
        column: Column,
        list: Vec<Arc<dyn Expression>>,
    },
    InQuery {
        column: Column,
        query: Arc<dyn Query>,
    },
}

/// One atomic, immutable index condition.
///
/// Created by predicate analysis during compilation, read many times
/// by index selection, held by the chosen access plan until execution
/// completes. Never mutated after construction.
#[derive(Clone)]
pub struct IndexCondition {
    kind: ConditionKind,
}

impl IndexCondition {
    /// A bit of a search mask meaning 'equal'.
    pub const EQUALITY: u8 = 1;

    /// A bit of a search mask meaning 'larger or equal'.
    pub const START: u8 = 2;

    /// A bit of a search mask meaning 'smaller or equal'.
    pub const END: u8 = 4;

    /// A search mask meaning 'between'.
    pub const RANGE: u8 = Self::START | Self::END;

    /// A bit of a search mask meaning 'the condition is always false'.
    pub const ALWAYS_FALSE: u8 = 8;

    /// Create a scalar comparison condition. Pure data constructor:
    /// no evaluation, no coercion.
    #[must_use]
    pub fn scalar(op: ScalarOp, column: Column, expression: Arc<dyn Expression>) -> Self {
        Self {
            kind: ConditionKind::Scalar {
                column,
                op,
                expression,
            },
        }
    }

    /// The always-false contradiction. Carries no column and no
    /// expression.
    #[must_use]
    pub const fn always_false() -> Self {
        Self {
            kind: ConditionKind::AlwaysFalse,
        }
    }

    /// Create an IN-list condition over statically known expressions.
    #[must_use]
    pub fn in_list(column: Column, list: Vec<Arc<dyn Expression>>) -> Self {
        Self {
            kind: ConditionKind::InList { column, list },
        }
    }

    /// Create an IN-subquery condition.
    #[must_use]
    pub fn in_query(column: Column, query: Arc<dyn Query>) -> Self {
        Self {
            kind: ConditionKind::InQuery { column, query },
        }
    }

    /// The flat operator code of this condition.
    #[must_use]
    pub fn compare_type(&self) -> Comparison {
        match &self.kind {
            ConditionKind::AlwaysFalse => Comparison::False,
            ConditionKind::Scalar { op, .. } => (*op).into(),
            ConditionKind::InList { .. } => Comparison::InList,
            ConditionKind::InQuery { .. } => Comparison::InQuery,
        }
    }

    /// The scalar operator, when this is a scalar condition.
    #[must_use]
    pub fn scalar_op(&self) -> Option<ScalarOp> {
        match &self.kind {
            ConditionKind::Scalar { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// The subquery handle, when this is an IN-subquery condition.
    #[must_use]
    pub fn subquery(&self) -> Option<&Arc<dyn Query>> {
        match &self.kind {
            ConditionKind::InQuery { query, .. } => Some(query),
            _ => None,
        }
    }

    /// The target column; `None` only for the always-false condition.
    #[must_use]
    pub fn column(&self) -> Option<&Column> {
        match &self.kind {
            ConditionKind::AlwaysFalse => None,
            ConditionKind::Scalar { column, .. }
            | ConditionKind::InList { column, .. }
            | ConditionKind::InQuery { column, .. } => Some(column),
        }
    }

    /// The comparison bit mask of this condition, given all
    /// conditions that apply to the same index in this planning
    /// decision.
    ///
    /// Combined with other conditions, IN(..) can only drive index
    /// access on regular tables; on any other table kind the
    /// condition keeps mask 0 and stays a residual filter.
    #[must_use]
    pub fn mask(&self, peers: &[IndexCondition]) -> u8 {
        match &self.kind {
            ConditionKind::AlwaysFalse => Self::ALWAYS_FALSE,
            ConditionKind::Scalar { op, .. } => match op {
                ScalarOp::Equal | ScalarOp::EqualNullSafe => Self::EQUALITY,
                ScalarOp::Bigger | ScalarOp::BiggerEqual => Self::START,
                ScalarOp::Smaller | ScalarOp::SmallerEqual => Self::END,
            },
            ConditionKind::InList { column, .. } | ConditionKind::InQuery { column, .. } => {
                if peers.len() > 1 && column.table().kind() != TableKind::Regular {
                    0
                } else {
                    Self::EQUALITY
                }
            }
        }
    }

    /// Check if the result is always false.
    #[must_use]
    pub fn is_always_false(&self) -> bool {
        matches!(self.kind, ConditionKind::AlwaysFalse)
    }

    /// Check if this condition constrains the scan start (equality
    /// or lower bound).
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.scalar_op().is_some_and(ScalarOp::is_start)
    }

    /// Check if this condition constrains the scan end (equality or
    /// upper bound).
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.scalar_op().is_some_and(ScalarOp::is_end)
    }

    /// Current value of the scalar right-hand side.
    ///
    /// No coercion happens here; callers that need the column's type
    /// must convert through the column.
    pub fn current_value(&self, session: &Session) -> ShardResult<SqlValue> {
        match &self.kind {
            ConditionKind::Scalar { expression, .. } => expression.value(session),
            _ => Err(ShardError::internal(
                "current_value on a non-scalar index condition",
            )),
        }
    }

    /// Current value list of an IN-list condition: every element
    /// evaluated, coerced to the column type, sorted ascending under
    /// the session's compare mode, duplicates collapsed to one
    /// representative.
    pub fn current_value_list(&self, session: &Session) -> ShardResult<Vec<SqlValue>> {
        let ConditionKind::InList { column, list } = &self.kind else {
            return Err(ShardError::internal(
                "current_value_list on a non-IN-list index condition",
            ));
        };
        let mode = *session.compare_mode();
        let mut values = Vec::with_capacity(list.len());
        for e in list {
            values.push(column.convert(&e.value(session)?)?);
        }
        values.sort_by(|a, b| a.compare(b, &mode));
        values.dedup_by(|a, b| a.compare(b, &mode) == Ordering::Equal);
        Ok(values)
    }

    /// Current result of an IN-subquery condition, unbounded. The
    /// rows may not be of uniform type, so they may not be unique and
    /// carry no ordering guarantee.
    pub fn current_result(&self, session: &Session) -> ShardResult<QueryResult> {
        match &self.kind {
            ConditionKind::InQuery { query, .. } => query.execute(session, 0),
            _ => Err(ShardError::internal(
                "current_result on a non-IN-subquery index condition",
            )),
        }
    }

    /// Check if the right-hand side can be evaluated right now.
    /// Never fails; an unevaluatable condition stays a residual
    /// filter.
    #[must_use]
    pub fn is_evaluatable(&self) -> bool {
        match &self.kind {
            ConditionKind::AlwaysFalse => true,
            ConditionKind::Scalar { expression, .. } => {
                expression.is_everything(ExpressionVisitor::Evaluatable)
            }
            ConditionKind::InList { list, .. } => list
                .iter()
                .all(|e| e.is_everything(ExpressionVisitor::Evaluatable)),
            ConditionKind::InQuery { query, .. } => {
                query.is_everything(ExpressionVisitor::Evaluatable)
            }
        }
    }

    /// The SQL snippet of this condition, for explain output. Stable
    /// for a given condition.
    #[must_use]
    pub fn sql(&self) -> String {
        let mut buff = SqlBuilder::new();
        match &self.kind {
            ConditionKind::AlwaysFalse => return "FALSE".to_owned(),
            ConditionKind::Scalar {
                column,
                op,
                expression,
            } => {
                buff.append(&column.sql())
                    .append_char(' ')
                    .append(op.symbol())
                    .append_char(' ')
                    .append(&expression.sql());
            }
            ConditionKind::InList { column, list } => {
                buff.append(&column.sql()).append(" IN(");
                for e in list {
                    buff.append_except_first(", ");
                    buff.append(&e.sql());
                }
                buff.append_char(')');
            }
            ConditionKind::InQuery { column, query } => {
                buff.append(&column.sql())
                    .append(" IN(")
                    .append(&query.plan_sql())
                    .append_char(')');
            }
        }
        buff.finish()
    }
}

impl std::fmt::Debug for IndexCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IndexCondition({})", self.sql())
    }
}
