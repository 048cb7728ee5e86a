//! Index-condition model for the shardsql query planner.
//!
//! Implements:
//! - The index-condition algebra: one atomic predicate per condition,
//!   with scalar, IN-list, IN-subquery, and always-false payloads
//! - Access-mask derivation (equality / start / end / always-false)
//!   including the IN-with-peers downgrade on non-regular tables
//! - Per-index folding of conditions into column bounds, usable key
//!   prefix, and residual filters
//! - Explain-SQL reconstruction of every condition
//!
//! The expression tree, subquery executor, and catalog stay behind
//! narrow seams ([`Expression`], [`Query`], [`Column`]); the planner
//! core consumes capabilities, not concrete node types.

pub mod bounds;
pub mod catalog;
pub mod condition;
pub mod explain;
pub mod expression;
pub mod session;

pub use bounds::{fold_index_conditions, Bound, ColumnBounds, InSource, IndexLookup};
pub use catalog::{Column, Table, TableKind};
pub use condition::{Comparison, IndexCondition, ScalarOp};
pub use expression::{
    Expression, ExpressionVisitor, Parameter, Query, QueryResult, ValueExpression,
};
pub use session::{Database, Session};
