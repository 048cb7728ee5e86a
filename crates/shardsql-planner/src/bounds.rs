//! Folding index conditions into per-column access bounds.
//!
//! Given the conditions collected for one candidate index, the fold
//! computes, per index column, the equality constraints, the tightest
//! lower and upper bound, and at most one IN source, and derives the
//! usable key prefix. Conditions that cannot drive index access are
//! reported back as residual filters, never silently dropped.
//!
//! The outcome depends only on the set of conditions, not their input
//! order.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use shardsql_error::ShardResult;
use shardsql_types::{CompareMode, SqlValue};

use crate::catalog::Column;
use crate::condition::{Comparison, IndexCondition};
use crate::expression::Query;
use crate::session::Session;

/// One end of a column's scan range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// The bounding value, already coerced to the column type.
    pub value: SqlValue,
    /// Whether the bound value itself is part of the range.
    pub inclusive: bool,
}

/// The IN source retained for a column: a materialized, sorted,
/// distinct list, or a lazy subquery with no such guarantees.
#[derive(Clone)]
pub enum InSource {
    /// Statically known values, sorted and distinct.
    List(Vec<SqlValue>),
    /// A subquery evaluated at execution time.
    Subquery(Arc<dyn Query>),
}

impl fmt::Debug for InSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Subquery(q) => f.debug_tuple("Subquery").field(&q.plan_sql()).finish(),
        }
    }
}

/// Access summary for one index column.
#[derive(Debug, Clone, Default)]
pub struct ColumnBounds {
    /// Distinct equality constants. More than one distinct constant
    /// is a contradiction and surfaces as
    /// [`IndexLookup::AlwaysFalse`] instead.
    pub equalities: Vec<SqlValue>,
    /// Tightest lower bound of all start-class conditions.
    pub lower: Option<Bound>,
    /// Tightest upper bound of all end-class conditions.
    pub upper: Option<Bound>,
    /// At most one IN source; lists are preferred over subqueries.
    pub in_set: Option<InSource>,
    /// Union of the contributing conditions' masks.
    pub mask: u8,
}

impl ColumnBounds {
    /// Whether any condition constrained this column.
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        self.mask != 0
    }
}

/// The fold outcome for one candidate index.
#[derive(Debug)]
pub enum IndexLookup {
    /// The predicate set is contradictory; the scan returns no rows.
    AlwaysFalse,
    /// Per-column bounds plus everything that stays a filter.
    Bounds {
        /// One entry per index column, in key order.
        columns: Vec<ColumnBounds>,
        /// Longest equality-constrained key prefix, extended by at
        /// most one range-constrained column.
        usable_prefix_len: usize,
        /// Conditions kept for post-scan evaluation: unevaluatable,
        /// off-index, or denied index access by the mask rules.
        residuals: Vec<IndexCondition>,
    },
}

/// Fold the conditions collected for one candidate index into
/// per-column access bounds.
///
/// Every equality and range value is evaluated under `session` and
/// coerced to its column's type before it lands in the summary.
pub fn fold_index_conditions(
    session: &Session,
    index_columns: &[Column],
    conditions: &[IndexCondition],
) -> ShardResult<IndexLookup> {
    if conditions.iter().any(IndexCondition::is_always_false) {
        tracing::debug!(reason = "always_false_condition", "index_bounds.contradiction");
        return Ok(IndexLookup::AlwaysFalse);
    }

    let mode = *session.compare_mode();
    let mut columns: Vec<ColumnBounds> = vec![ColumnBounds::default(); index_columns.len()];
    let mut residuals: Vec<IndexCondition> = Vec::new();

    for ic in conditions {
        if !ic.is_evaluatable() {
            residuals.push(ic.clone());
            continue;
        }
        let position = ic
            .column()
            .and_then(|c| index_columns.iter().position(|index_col| index_col == c));
        let Some(position) = position else {
            residuals.push(ic.clone());
            continue;
        };
        let mask = ic.mask(conditions);
        if mask == 0 {
            residuals.push(ic.clone());
            continue;
        }

        let column = &index_columns[position];
        let entry = &mut columns[position];
        entry.mask |= mask;

        match ic.compare_type() {
            Comparison::Equal | Comparison::EqualNullSafe => {
                let value = column.convert(&ic.current_value(session)?)?;
                if let Some(previous) = entry.equalities.first() {
                    if previous.compare(&value, &mode) != Ordering::Equal {
                        tracing::debug!(
                            column = column.name(),
                            reason = "conflicting_equalities",
                            "index_bounds.contradiction"
                        );
                        return Ok(IndexLookup::AlwaysFalse);
                    }
                } else {
                    entry.equalities.push(value);
                }
            }
            Comparison::Bigger | Comparison::BiggerEqual => {
                let value = column.convert(&ic.current_value(session)?)?;
                let inclusive = ic.compare_type() == Comparison::BiggerEqual;
                tighten_lower(&mut entry.lower, Bound { value, inclusive }, &mode);
            }
            Comparison::Smaller | Comparison::SmallerEqual => {
                let value = column.convert(&ic.current_value(session)?)?;
                let inclusive = ic.compare_type() == Comparison::SmallerEqual;
                tighten_upper(&mut entry.upper, Bound { value, inclusive }, &mode);
            }
            Comparison::InList => {
                let values = ic.current_value_list(session)?;
                match entry.in_set.take() {
                    Some(InSource::List(previous)) => {
                        let merged = intersect_sorted(&previous, &values, &mode);
                        if merged.is_empty() {
                            tracing::debug!(
                                column = column.name(),
                                reason = "empty_in_intersection",
                                "index_bounds.contradiction"
                            );
                            return Ok(IndexLookup::AlwaysFalse);
                        }
                        entry.in_set = Some(InSource::List(merged));
                    }
                    // A list beats a lazy subquery.
                    Some(InSource::Subquery(_)) | None => {
                        entry.in_set = Some(InSource::List(values));
                    }
                }
            }
            Comparison::InQuery => {
                if let Some(query) = ic.subquery() {
                    if entry.in_set.is_none() {
                        entry.in_set = Some(InSource::Subquery(query.clone()));
                    }
                }
            }
            Comparison::False => unreachable!("filtered before the per-condition loop"),
        }
    }

    let usable_prefix_len = usable_prefix(&columns);
    tracing::debug!(
        index_columns = index_columns.len(),
        usable_prefix_len,
        residual_count = residuals.len(),
        "index_bounds.folded"
    );
    Ok(IndexLookup::Bounds {
        columns,
        usable_prefix_len,
        residuals,
    })
}

/// Longest run of equality-constrained leading columns, extended by
/// at most one column contributing a range bound.
fn usable_prefix(columns: &[ColumnBounds]) -> usize {
    let mut prefix = 0;
    while prefix < columns.len() && columns[prefix].mask & IndexCondition::EQUALITY != 0 {
        prefix += 1;
    }
    if prefix < columns.len() && columns[prefix].mask & IndexCondition::RANGE != 0 {
        prefix += 1;
    }
    prefix
}

/// Keep the larger lower bound; at equal values a strict bound beats
/// an inclusive one.
fn tighten_lower(current: &mut Option<Bound>, candidate: Bound, mode: &CompareMode) {
    match current {
        None => *current = Some(candidate),
        Some(existing) => match candidate.value.compare(&existing.value, mode) {
            Ordering::Greater => *existing = candidate,
            Ordering::Equal if !candidate.inclusive => existing.inclusive = false,
            _ => {}
        },
    }
}

/// Keep the smaller upper bound; at equal values a strict bound beats
/// an inclusive one.
fn tighten_upper(current: &mut Option<Bound>, candidate: Bound, mode: &CompareMode) {
    match current {
        None => *current = Some(candidate),
        Some(existing) => match candidate.value.compare(&existing.value, mode) {
            Ordering::Less => *existing = candidate,
            Ordering::Equal if !candidate.inclusive => existing.inclusive = false,
            _ => {}
        },
    }
}

/// Intersection of two sorted distinct value lists.
fn intersect_sorted(a: &[SqlValue], b: &[SqlValue], mode: &CompareMode) -> Vec<SqlValue> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].compare(&b[j], mode) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Table, TableKind};
    use crate::condition::ScalarOp;
    use crate::expression::{
        Expression, ExpressionVisitor, Parameter, QueryResult, ValueExpression,
    };
    use crate::session::Database;
    use shardsql_error::ShardResult;
    use shardsql_types::TypeId;

    struct StaticQuery {
        rows: Vec<i64>,
        sql: &'static str,
    }

    impl Query for StaticQuery {
        fn execute(&self, session: &Session, max_rows: usize) -> ShardResult<QueryResult> {
            session.check_cancelled()?;
            let mut rows: Vec<Vec<SqlValue>> =
                self.rows.iter().map(|&v| vec![SqlValue::Bigint(v)]).collect();
            if max_rows > 0 {
                rows.truncate(max_rows);
            }
            Ok(QueryResult::new(1, rows))
        }

        fn plan_sql(&self) -> String {
            self.sql.to_owned()
        }

        fn is_everything(&self, _visitor: ExpressionVisitor) -> bool {
            true
        }
    }

    fn session() -> Session {
        Session::new(Arc::new(Database::default()))
    }

    fn regular_table() -> Arc<Table> {
        Arc::new(Table::new("TEST", TableKind::Regular))
    }

    fn int_column(table: &Arc<Table>, name: &str, ordinal: usize) -> Column {
        Column::new(table.clone(), name, ordinal, TypeId::Int)
    }

    fn literal(v: i64) -> Arc<dyn Expression> {
        ValueExpression::arc(SqlValue::Bigint(v))
    }

    fn bounds(lookup: IndexLookup) -> (Vec<ColumnBounds>, usize, Vec<IndexCondition>) {
        match lookup {
            IndexLookup::Bounds {
                columns,
                usable_prefix_len,
                residuals,
            } => (columns, usable_prefix_len, residuals),
            IndexLookup::AlwaysFalse => panic!("expected usable bounds"),
        }
    }

    #[test]
    fn test_range_fold_keeps_tightest_bounds() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let conditions = [
            IndexCondition::scalar(ScalarOp::BiggerEqual, a.clone(), literal(10)),
            IndexCondition::scalar(ScalarOp::Smaller, a.clone(), literal(20)),
        ];
        let (columns, prefix, residuals) =
            bounds(fold_index_conditions(&session(), &[a], &conditions).unwrap());
        assert!(residuals.is_empty());
        assert_eq!(prefix, 1);
        assert!(columns[0].equalities.is_empty());
        assert_eq!(
            columns[0].lower,
            Some(Bound {
                value: SqlValue::Int(10),
                inclusive: true
            })
        );
        assert_eq!(
            columns[0].upper,
            Some(Bound {
                value: SqlValue::Int(20),
                inclusive: false
            })
        );
        assert_eq!(columns[0].mask, IndexCondition::RANGE);
    }

    #[test]
    fn test_tighter_bound_wins_and_strict_beats_inclusive() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let conditions = [
            IndexCondition::scalar(ScalarOp::Bigger, a.clone(), literal(5)),
            IndexCondition::scalar(ScalarOp::BiggerEqual, a.clone(), literal(5)),
            IndexCondition::scalar(ScalarOp::BiggerEqual, a.clone(), literal(3)),
        ];
        let (columns, _, _) =
            bounds(fold_index_conditions(&session(), &[a], &conditions).unwrap());
        assert_eq!(
            columns[0].lower,
            Some(Bound {
                value: SqlValue::Int(5),
                inclusive: false
            })
        );
    }

    #[test]
    fn test_contradictory_equalities_fold_to_always_false() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let conditions = [
            IndexCondition::scalar(ScalarOp::Equal, a.clone(), literal(1)),
            IndexCondition::scalar(ScalarOp::Equal, a.clone(), literal(2)),
        ];
        assert!(matches!(
            fold_index_conditions(&session(), &[a], &conditions).unwrap(),
            IndexLookup::AlwaysFalse
        ));
    }

    #[test]
    fn test_duplicate_equalities_are_compatible() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let conditions = [
            IndexCondition::scalar(ScalarOp::Equal, a.clone(), literal(1)),
            IndexCondition::scalar(ScalarOp::Equal, a.clone(), literal(1)),
        ];
        let (columns, prefix, _) =
            bounds(fold_index_conditions(&session(), &[a], &conditions).unwrap());
        assert_eq!(columns[0].equalities, vec![SqlValue::Int(1)]);
        assert_eq!(prefix, 1);
    }

    #[test]
    fn test_explicit_false_condition_wins() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let conditions = [
            IndexCondition::scalar(ScalarOp::Equal, a.clone(), literal(1)),
            IndexCondition::always_false(),
        ];
        assert!(matches!(
            fold_index_conditions(&session(), &[a], &conditions).unwrap(),
            IndexLookup::AlwaysFalse
        ));
    }

    #[test]
    fn test_equality_prefix_extended_by_one_range_column() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let b = int_column(&t, "B", 1);
        let c = int_column(&t, "C", 2);
        let conditions = [
            IndexCondition::scalar(ScalarOp::Equal, a.clone(), literal(1)),
            IndexCondition::scalar(ScalarOp::Bigger, b.clone(), literal(10)),
            IndexCondition::scalar(ScalarOp::Smaller, c.clone(), literal(5)),
        ];
        let (columns, prefix, _) =
            bounds(fold_index_conditions(&session(), &[a, b, c], &conditions).unwrap());
        // Equality on A, range on B; C's bound is beyond the prefix
        // but still recorded.
        assert_eq!(prefix, 2);
        assert!(columns[2].upper.is_some());
    }

    #[test]
    fn test_in_list_on_regular_table_with_peer() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let b = int_column(&t, "B", 1);
        let conditions = [
            IndexCondition::in_list(
                a.clone(),
                vec![literal(1), literal(3), literal(2), literal(2)],
            ),
            IndexCondition::scalar(ScalarOp::Equal, b.clone(), literal(7)),
        ];
        let (columns, prefix, residuals) =
            bounds(fold_index_conditions(&session(), &[a, b], &conditions).unwrap());
        assert!(residuals.is_empty());
        assert_eq!(prefix, 2);
        match &columns[0].in_set {
            Some(InSource::List(values)) => assert_eq!(
                values,
                &[SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
            ),
            other => panic!("expected IN list, got {other:?}"),
        }
    }

    #[test]
    fn test_in_on_view_with_peer_goes_residual() {
        let t = Arc::new(Table::new("V", TableKind::View));
        let a = int_column(&t, "A", 0);
        let b = int_column(&t, "B", 1);
        let in_cond =
            IndexCondition::in_list(a.clone(), vec![literal(1), literal(2)]);
        let conditions = [
            in_cond.clone(),
            IndexCondition::scalar(ScalarOp::Equal, b.clone(), literal(7)),
        ];
        let (columns, prefix, residuals) =
            bounds(fold_index_conditions(&session(), &[a, b], &conditions).unwrap());
        assert!(columns[0].in_set.is_none());
        assert_eq!(columns[0].mask, 0);
        assert_eq!(prefix, 0);
        assert_eq!(residuals.len(), 1);
        assert_eq!(residuals[0].sql(), in_cond.sql());
    }

    #[test]
    fn test_two_in_lists_intersect() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let conditions = [
            IndexCondition::in_list(a.clone(), vec![literal(1), literal(2), literal(3)]),
            IndexCondition::in_list(a.clone(), vec![literal(2), literal(3), literal(4)]),
        ];
        let (columns, _, _) =
            bounds(fold_index_conditions(&session(), &[a], &conditions).unwrap());
        match &columns[0].in_set {
            Some(InSource::List(values)) => {
                assert_eq!(values, &[SqlValue::Int(2), SqlValue::Int(3)]);
            }
            other => panic!("expected IN list, got {other:?}"),
        }
    }

    #[test]
    fn test_disjoint_in_lists_fold_to_always_false() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let conditions = [
            IndexCondition::in_list(a.clone(), vec![literal(1), literal(2)]),
            IndexCondition::in_list(a.clone(), vec![literal(3), literal(4)]),
        ];
        assert!(matches!(
            fold_index_conditions(&session(), &[a], &conditions).unwrap(),
            IndexLookup::AlwaysFalse
        ));
    }

    #[test]
    fn test_in_list_preferred_over_subquery() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let subquery: Arc<dyn Query> = Arc::new(StaticQuery {
            rows: vec![5, 6],
            sql: "SELECT X FROM S",
        });
        let conditions = [
            IndexCondition::in_query(a.clone(), subquery),
            IndexCondition::in_list(a.clone(), vec![literal(1)]),
        ];
        let (columns, _, _) =
            bounds(fold_index_conditions(&session(), &[a], &conditions).unwrap());
        assert!(matches!(columns[0].in_set, Some(InSource::List(_))));
    }

    #[test]
    fn test_unevaluatable_condition_is_residual() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let param = Arc::new(Parameter::new(1));
        let conditions = [IndexCondition::scalar(
            ScalarOp::Equal,
            a.clone(),
            param as Arc<dyn Expression>,
        )];
        let (columns, prefix, residuals) =
            bounds(fold_index_conditions(&session(), &[a], &conditions).unwrap());
        assert!(!columns[0].is_constrained());
        assert_eq!(prefix, 0);
        assert_eq!(residuals.len(), 1);
    }

    #[test]
    fn test_off_index_condition_is_residual() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let other = int_column(&t, "Z", 9);
        let conditions = [IndexCondition::scalar(ScalarOp::Equal, other, literal(1))];
        let (_, prefix, residuals) =
            bounds(fold_index_conditions(&session(), &[a], &conditions).unwrap());
        assert_eq!(prefix, 0);
        assert_eq!(residuals.len(), 1);
    }

    #[test]
    fn test_fold_is_order_independent() {
        let t = regular_table();
        let a = int_column(&t, "A", 0);
        let b = int_column(&t, "B", 1);
        let forward = [
            IndexCondition::scalar(ScalarOp::Equal, a.clone(), literal(1)),
            IndexCondition::scalar(ScalarOp::BiggerEqual, b.clone(), literal(2)),
            IndexCondition::scalar(ScalarOp::Smaller, b.clone(), literal(9)),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        let index = [a, b];
        let (cols_f, prefix_f, _) =
            bounds(fold_index_conditions(&session(), &index, &forward).unwrap());
        let (cols_r, prefix_r, _) =
            bounds(fold_index_conditions(&session(), &index, &reversed).unwrap());
        assert_eq!(prefix_f, prefix_r);
        assert_eq!(cols_f[1].lower, cols_r[1].lower);
        assert_eq!(cols_f[1].upper, cols_r[1].upper);
    }
}
