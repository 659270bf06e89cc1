//! Sort field resolution against a server-controlled allowlist.
//!
//! Clients only ever name logical fields (`createdAt`, `name`, ...). The
//! allowlist in [`SearchOptions`] maps those names to storage columns, and any
//! field that is not listed there resolves to `None`.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::search::SearchOptions;

/// Ordering direction of a single sort key.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

impl SortDirection {
    /// SQL keyword for `ORDER BY`.
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A single client-facing sort instruction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SortParam {
    /// Logical field name, never a raw column.
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortParam {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Unique field appended to a sort order so that the composite order is total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TieBreaker {
    /// Field whose direction the tie-breaker inherits when present.
    pub primary: String,
    /// Unique field used to break ties (usually the primary key).
    pub tie_breaker: String,
}

impl TieBreaker {
    pub fn new(primary: impl Into<String>, tie_breaker: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            tie_breaker: tie_breaker.into(),
        }
    }
}

/// Arguments of [`normalize_sorts`].
#[derive(Clone, Copy, Debug)]
pub struct NormalizeSorts<'a> {
    pub sorts: &'a [SortParam],
    pub allowed: &'a SearchOptions,
    pub defaults: &'a [SortParam],
    pub tie_breaker: Option<&'a TieBreaker>,
}

/// Filters client sorts to allowlisted fields, falls back to `defaults` and
/// pads the result with the tie-breaker when one is given.
///
/// Client order is preserved. A field named more than once keeps its first
/// occurrence only.
pub fn normalize_sorts(args: NormalizeSorts<'_>) -> Vec<SortParam> {
    let mut seen = HashSet::new();
    let mut sorts: Vec<SortParam> = args
        .sorts
        .iter()
        .filter(|sort| args.allowed.column_for(&sort.field).is_some())
        .filter(|sort| seen.insert(sort.field.as_str()))
        .cloned()
        .collect();

    if sorts.is_empty() {
        sorts = args.defaults.to_vec();
    }

    if let Some(tie_breaker) = args.tie_breaker {
        ensure_tie_breaker(&mut sorts, tie_breaker);
    }

    sorts
}

/// Appends the tie-breaker field unless it is already part of `sorts`.
///
/// Direction is taken from the `primary` field if sorted on, otherwise from
/// the first sort entry, otherwise ascending.
pub fn ensure_tie_breaker(sorts: &mut Vec<SortParam>, rule: &TieBreaker) {
    if sorts.iter().any(|sort| sort.field == rule.tie_breaker) {
        return;
    }

    let direction = sorts
        .iter()
        .find(|sort| sort.field == rule.primary)
        .or_else(|| sorts.first())
        .map(|sort| sort.direction)
        .unwrap_or_default();

    sorts.push(SortParam::new(rule.tie_breaker.clone(), direction));
}

/// Resolves logical sort fields to storage columns.
pub trait SortResolver {
    /// Looks up the storage column for `field`; `None` when not allowlisted.
    fn resolve_column<'o>(&self, options: &'o SearchOptions, field: &str) -> Option<&'o str>;

    /// Produces the effective sort order for a request.
    ///
    /// The result is never empty as long as `options` was built through
    /// [`SearchOptions::builder`].
    fn normalize_sorts(
        &self,
        options: &SearchOptions,
        sorts: &[SortParam],
        with_tie_breaker: bool,
    ) -> Vec<SortParam>;
}

/// [`SortResolver`] backed by the allowlist stored in [`SearchOptions`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowlistSortResolver;

impl SortResolver for AllowlistSortResolver {
    fn resolve_column<'o>(&self, options: &'o SearchOptions, field: &str) -> Option<&'o str> {
        options.column_for(field)
    }

    fn normalize_sorts(
        &self,
        options: &SearchOptions,
        sorts: &[SortParam],
        with_tie_breaker: bool,
    ) -> Vec<SortParam> {
        normalize_sorts(NormalizeSorts {
            sorts,
            allowed: options,
            defaults: options.default_sorts(),
            tie_breaker: options.tie_breaker().filter(|_| with_tie_breaker),
        })
    }
}

impl<T: SortResolver + ?Sized> SortResolver for &T {
    fn resolve_column<'o>(&self, options: &'o SearchOptions, field: &str) -> Option<&'o str> {
        (**self).resolve_column(options, field)
    }

    fn normalize_sorts(
        &self,
        options: &SearchOptions,
        sorts: &[SortParam],
        with_tie_breaker: bool,
    ) -> Vec<SortParam> {
        (**self).normalize_sorts(options, sorts, with_tie_breaker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SearchOptions {
        SearchOptions::builder()
            .allow("createdAt", "created_at")
            .allow("name", "name")
            .allow("id", "id")
            .default_sort(SortParam::desc("createdAt"))
            .tie_breaker(TieBreaker::new("createdAt", "id"))
            .build()
            .expect("valid options")
    }

    #[test]
    fn resolve_column_only_returns_allowlisted_columns() {
        let options = options();
        let resolver = AllowlistSortResolver;

        assert_eq!(resolver.resolve_column(&options, "name"), Some("name"));
        assert_eq!(
            resolver.resolve_column(&options, "createdAt"),
            Some("created_at")
        );
        assert_eq!(resolver.resolve_column(&options, "unknownField"), None);
        assert_eq!(resolver.resolve_column(&options, "created_at"), None);
    }

    #[test]
    fn empty_sorts_fall_back_to_defaults() {
        let options = options();
        let defaults = vec![SortParam::desc("createdAt")];

        let sorts = normalize_sorts(NormalizeSorts {
            sorts: &[],
            allowed: &options,
            defaults: &defaults,
            tie_breaker: None,
        });

        assert_eq!(sorts, defaults);
    }

    #[test]
    fn disallowed_fields_are_filtered_preserving_order() {
        let options = options();
        let requested = vec![
            SortParam::asc("name"),
            SortParam::desc("password"),
            SortParam::asc("createdAt"),
        ];

        let sorts = normalize_sorts(NormalizeSorts {
            sorts: &requested,
            allowed: &options,
            defaults: options.default_sorts(),
            tie_breaker: None,
        });

        assert_eq!(
            sorts,
            vec![SortParam::asc("name"), SortParam::asc("createdAt")]
        );
    }

    #[test]
    fn only_disallowed_fields_fall_back_to_defaults() {
        let options = options();
        let requested = vec![SortParam::asc("password")];

        let sorts = AllowlistSortResolver.normalize_sorts(&options, &requested, false);

        assert_eq!(sorts, vec![SortParam::desc("createdAt")]);
    }

    #[test]
    fn duplicate_fields_keep_first_occurrence() {
        let options = options();
        let requested = vec![SortParam::asc("name"), SortParam::desc("name")];

        let sorts = AllowlistSortResolver.normalize_sorts(&options, &requested, false);

        assert_eq!(sorts, vec![SortParam::asc("name")]);
    }

    #[test]
    fn tie_breaker_inherits_primary_direction() {
        let mut sorts = vec![SortParam::asc("createdAt")];

        ensure_tie_breaker(&mut sorts, &TieBreaker::new("createdAt", "id"));

        assert_eq!(sorts, vec![SortParam::asc("createdAt"), SortParam::asc("id")]);
    }

    #[test]
    fn tie_breaker_falls_back_to_first_sort_direction() {
        let mut sorts = vec![SortParam::desc("name"), SortParam::asc("email")];

        ensure_tie_breaker(&mut sorts, &TieBreaker::new("createdAt", "id"));

        assert_eq!(sorts.last(), Some(&SortParam::desc("id")));
    }

    #[test]
    fn tie_breaker_defaults_to_ascending_on_empty_sorts() {
        let mut sorts = Vec::new();

        ensure_tie_breaker(&mut sorts, &TieBreaker::new("createdAt", "id"));

        assert_eq!(sorts, vec![SortParam::asc("id")]);
    }

    #[test]
    fn tie_breaker_already_present_is_noop() {
        let mut sorts = vec![SortParam::desc("id"), SortParam::asc("name")];

        ensure_tie_breaker(&mut sorts, &TieBreaker::new("name", "id"));

        assert_eq!(sorts, vec![SortParam::desc("id"), SortParam::asc("name")]);
    }

    #[test]
    fn cursor_mode_normalization_appends_tie_breaker_once() {
        let options = options();

        let sorts = AllowlistSortResolver.normalize_sorts(&options, &[], true);

        assert_eq!(
            sorts,
            vec![SortParam::desc("createdAt"), SortParam::desc("id")]
        );
    }

    #[test]
    fn direction_parses_upper_and_lower_case() {
        let upper: SortParam = serde_json::from_str(r#"{"field":"name","direction":"DESC"}"#)
            .expect("valid sort");
        let lower: SortParam = serde_json::from_str(r#"{"field":"name","direction":"desc"}"#)
            .expect("valid sort");
        let missing: SortParam = serde_json::from_str(r#"{"field":"name"}"#).expect("valid sort");

        assert_eq!(upper.direction, SortDirection::Desc);
        assert_eq!(lower.direction, SortDirection::Desc);
        assert_eq!(missing.direction, SortDirection::Asc);
    }
}
