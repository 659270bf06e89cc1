//! "Strictly after" predicate for keyset pagination.
//!
//! For sort columns `c1..cn` with last-seen values `v1..vn` the predicate is
//!
//! ```text
//! (c1 ⋗ v1) OR (c1 = v1 AND c2 ⋗ v2) OR ... OR (c1 = v1 AND ... AND cn ⋗ vn)
//! ```
//!
//! where `⋗` is `>` for ascending and `<` for descending columns.

use std::cmp::Ordering;

use crate::search::cursor::CursorValue;
use crate::search::sort::SortDirection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
}

impl Comparison {
    /// Comparison that moves forward along a column sorted in `direction`.
    pub const fn after(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Comparison::Greater,
            SortDirection::Desc => Comparison::Less,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Greater => ordering == Ordering::Greater,
            Comparison::Less => ordering == Ordering::Less,
        }
    }
}

/// Storage column paired with the value it must equal or exceed.
#[derive(Clone, Debug, PartialEq)]
pub struct KeysetBound {
    pub column: String,
    pub value: CursorValue,
}

/// One OR-branch: equality on a prefix, strict comparison on the next column.
#[derive(Clone, Debug, PartialEq)]
pub struct KeysetBranch {
    pub equal: Vec<KeysetBound>,
    pub bound: KeysetBound,
    pub comparison: Comparison,
}

impl KeysetBranch {
    fn matches<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<CursorValue>,
    {
        let prefix_equal = self
            .equal
            .iter()
            .all(|eq| lookup(&eq.column).as_ref() == Some(&eq.value));

        prefix_equal
            && lookup(&self.bound.column)
                .and_then(|value| value.partial_cmp(&self.bound.value))
                .is_some_and(|ordering| self.comparison.holds(ordering))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeysetPredicate {
    branches: Vec<KeysetBranch>,
}

impl KeysetPredicate {
    /// Builds the predicate from `(column, direction, last value)` triples in
    /// sort order.
    pub fn strictly_after<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = (String, SortDirection, CursorValue)>,
    {
        let keys: Vec<_> = keys.into_iter().collect();
        let branches = keys
            .iter()
            .enumerate()
            .map(|(idx, (column, direction, value))| KeysetBranch {
                equal: keys[..idx]
                    .iter()
                    .map(|(column, _, value)| KeysetBound {
                        column: column.clone(),
                        value: value.clone(),
                    })
                    .collect(),
                bound: KeysetBound {
                    column: column.clone(),
                    value: value.clone(),
                },
                comparison: Comparison::after(*direction),
            })
            .collect();

        Self { branches }
    }

    pub fn branches(&self) -> &[KeysetBranch] {
        &self.branches
    }

    /// Evaluates the predicate against a row, `lookup` returning the row's
    /// value for a column.
    pub fn matches<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<CursorValue>,
    {
        self.branches.iter().any(|branch| branch.matches(&lookup))
    }
}
