//! [`QueryableSource`] over an in-memory vector, evaluating plans in Rust.

use std::cmp::Ordering;

use crate::repository::errors::RepositoryResult;
use crate::search::engine::{OrderColumn, QueryPlan, QueryableSource, SortableRow};
use crate::search::sort::SortDirection;

#[derive(Clone, Debug, Default)]
pub struct MemorySource<T> {
    rows: Vec<T>,
}

impl<T> MemorySource<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }
}

fn compare_rows<T: SortableRow>(a: &T, b: &T, order: &[OrderColumn]) -> Ordering {
    for column in order {
        let ordering = a
            .column_value(&column.column)
            .partial_cmp(&b.column_value(&column.column))
            .unwrap_or(Ordering::Equal);
        let ordering = match column.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl<T> MemorySource<T>
where
    T: SortableRow,
{
    fn filtered<'a>(&'a self, plan: &'a QueryPlan) -> impl Iterator<Item = &'a T> + 'a {
        self.rows
            .iter()
            .filter(move |row| plan.filter.as_ref().is_none_or(|f| f.matches(*row)))
    }
}

impl<T> QueryableSource for MemorySource<T>
where
    T: SortableRow + Clone,
{
    type Row = T;

    fn fetch(&self, plan: &QueryPlan) -> RepositoryResult<Vec<T>> {
        let mut rows: Vec<&T> = self
            .filtered(plan)
            .filter(|row| {
                plan.keyset
                    .as_ref()
                    .is_none_or(|keyset| keyset.matches(|column| row.column_value(column)))
            })
            .collect();

        rows.sort_by(|a, b| compare_rows(*a, *b, &plan.order));

        Ok(rows
            .into_iter()
            .skip(plan.offset.unwrap_or(0))
            .take(plan.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn count(&self, plan: &QueryPlan) -> RepositoryResult<usize> {
        Ok(self.filtered(plan).count())
    }
}
