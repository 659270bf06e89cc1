//! Building blocks for turning a [`QueryPlan`] into boxed Diesel queries.
//!
//! Each entity repository maps storage column names onto its `schema` columns;
//! the helpers here combine those per-column expressions into the text filter
//! and the keyset predicate.

use diesel::expression::BoxableExpression;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;

use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::search::cursor::CursorValue;
use crate::search::engine::{QueryPlan, TextFilter};
use crate::search::predicate::{Comparison, KeysetPredicate};

/// Boolean condition over the rows of table `T`.
pub(crate) type Predicate<T> = Box<dyn BoxableExpression<T, Sqlite, SqlType = Bool>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ColumnOp {
    Eq,
    Gt,
    Lt,
}

impl From<Comparison> for ColumnOp {
    fn from(comparison: Comparison) -> Self {
        match comparison {
            Comparison::Greater => ColumnOp::Gt,
            Comparison::Less => ColumnOp::Lt,
        }
    }
}

/// Boxes `$column <op> $value` as a [`Predicate`] on `$table`.
macro_rules! compare_column {
    ($table:ty, $column:expr, $op:expr, $value:expr) => {
        match $op {
            $crate::repository::query::ColumnOp::Eq => {
                Box::new($column.eq($value)) as $crate::repository::query::Predicate<$table>
            }
            $crate::repository::query::ColumnOp::Gt => {
                Box::new($column.gt($value)) as $crate::repository::query::Predicate<$table>
            }
            $crate::repository::query::ColumnOp::Lt => {
                Box::new($column.lt($value)) as $crate::repository::query::Predicate<$table>
            }
        }
    };
}

/// Appends `$column` to the ordering of a boxed query in `$direction`.
macro_rules! then_order_by {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            $crate::search::sort::SortDirection::Asc => $query.then_order_by($column.asc()),
            $crate::search::sort::SortDirection::Desc => $query.then_order_by($column.desc()),
        }
    };
}

pub(crate) use compare_column;
pub(crate) use then_order_by;

pub(crate) fn unknown_column(table: &str, column: &str) -> RepositoryError {
    RepositoryError::ValidationError(format!("{table} has no searchable column {column}"))
}

pub(crate) fn mismatched_value(table: &str, column: &str, value: &CursorValue) -> RepositoryError {
    RepositoryError::ValidationError(format!("{table}.{column} cannot be compared with {value:?}"))
}

/// Narrows a cursor integer to an `INTEGER` column value.
pub(crate) fn int_column_value(table: &str, column: &str, value: i64) -> RepositoryResult<i32> {
    i32::try_from(value).map_err(|_| mismatched_value(table, column, &CursorValue::Int(value)))
}

fn any_of<T: 'static>(predicates: Vec<Predicate<T>>) -> Option<Predicate<T>> {
    predicates
        .into_iter()
        .reduce(|acc, next| Box::new(acc.or(next)) as Predicate<T>)
}

/// OR of `like(column, pattern)` over every filter column.
pub(crate) fn text_predicate<T, F>(
    filter: &TextFilter,
    like: F,
) -> RepositoryResult<Option<Predicate<T>>>
where
    T: 'static,
    F: Fn(&str, String) -> RepositoryResult<Predicate<T>>,
{
    let pattern = filter.like_pattern();
    let predicates = filter
        .columns
        .iter()
        .map(|column| like(column, pattern.clone()))
        .collect::<RepositoryResult<Vec<_>>>()?;
    Ok(any_of(predicates))
}

/// Keyset predicate as `(a > ?) OR (a = ? AND b > ?) OR ...`.
pub(crate) fn keyset_predicate<T, F>(
    keyset: &KeysetPredicate,
    compare: F,
) -> RepositoryResult<Option<Predicate<T>>>
where
    T: 'static,
    F: Fn(&str, ColumnOp, &CursorValue) -> RepositoryResult<Predicate<T>>,
{
    let branches = keyset
        .branches()
        .iter()
        .map(|branch| {
            let bound = compare(
                &branch.bound.column,
                branch.comparison.into(),
                &branch.bound.value,
            )?;
            branch.equal.iter().rev().try_fold(bound, |acc, eq| {
                let equal = compare(&eq.column, ColumnOp::Eq, &eq.value)?;
                Ok(Box::new(equal.and(acc)) as Predicate<T>)
            })
        })
        .collect::<RepositoryResult<Vec<_>>>()?;
    Ok(any_of(branches))
}

/// `LIMIT`/`OFFSET` of the plan as SQL integers.
pub(crate) fn window(plan: &QueryPlan) -> (Option<i64>, Option<i64>) {
    let to_i64 = |value: usize| i64::try_from(value).unwrap_or(i64::MAX);
    (plan.limit.map(to_i64), plan.offset.map(to_i64))
}
