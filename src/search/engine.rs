//! Orchestrates sorting, cursor verification and paging against a source.

use crate::repository::errors::RepositoryResult;
use crate::search::cursor::{CursorError, CursorKey, CursorSigner, CursorToken, CursorValue};
use crate::search::errors::{SearchEngineResult, SearchError};
use crate::search::params::{CursorParams, OffsetParams, PaginationParams};
use crate::search::predicate::KeysetPredicate;
use crate::search::sort::{SortDirection, SortParam, SortResolver};
use crate::search::{SearchOptions, SearchParams, SearchResult};

/// Row whose column values can be read back for sorting and filtering.
pub trait SortableRow {
    fn column_value(&self, column: &str) -> Option<CursorValue>;
}

/// Substring match over a set of columns, case-insensitive for ASCII letters
/// only, the way SQLite's `LIKE` folds case. `"Ärzte"` does not match `"ä"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextFilter {
    pub columns: Vec<String>,
    pub term: String,
}

impl TextFilter {
    /// `LIKE` pattern with `%`, `_` and `\` escaped; pair with `ESCAPE '\'`.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.term.len() + 2);
        pattern.push('%');
        for c in self.term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    pub fn matches<R: SortableRow + ?Sized>(&self, row: &R) -> bool {
        let term = self.term.to_ascii_lowercase();
        self.columns
            .iter()
            .any(|column| match row.column_value(column) {
                Some(CursorValue::Text(text)) => text.to_ascii_lowercase().contains(&term),
                _ => false,
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderColumn {
    pub column: String,
    pub direction: SortDirection,
}

/// Everything a source needs to run one page query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryPlan {
    pub filter: Option<TextFilter>,
    pub keyset: Option<KeysetPredicate>,
    pub order: Vec<OrderColumn>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Option<TextFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn keyset(mut self, keyset: Option<KeysetPredicate>) -> Self {
        self.keyset = keyset;
        self
    }

    pub fn order_by(mut self, order: Vec<OrderColumn>) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Storage that can execute a [`QueryPlan`].
pub trait QueryableSource {
    type Row: SortableRow;

    /// Returns rows matching the filter and keyset predicate, ordered and
    /// windowed as the plan says.
    fn fetch(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Self::Row>>;

    /// Counts rows matching `plan.filter`; ordering, keyset and window are
    /// ignored.
    fn count(&self, plan: &QueryPlan) -> RepositoryResult<usize>;
}

impl<T: QueryableSource + ?Sized> QueryableSource for &T {
    type Row = T::Row;

    fn fetch(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Self::Row>> {
        (**self).fetch(plan)
    }

    fn count(&self, plan: &QueryPlan) -> RepositoryResult<usize> {
        (**self).count(plan)
    }
}

/// Pages a source by offset or by signed keyset cursor.
pub struct SearchEngine<R, C, Q> {
    resolver: R,
    signer: C,
    source: Q,
}

impl<R, C, Q> SearchEngine<R, C, Q>
where
    R: SortResolver,
    C: CursorSigner,
    Q: QueryableSource,
{
    pub fn new(resolver: R, signer: C, source: Q) -> Self {
        Self {
            resolver,
            signer,
            source,
        }
    }

    pub fn search(
        &self,
        params: SearchParams,
        options: &SearchOptions,
    ) -> SearchEngineResult<SearchResult<Q::Row>> {
        let filter = text_filter(options, params.query);
        match params.pagination {
            PaginationParams::Offset(offset) => self.search_offset(offset, filter, options),
            PaginationParams::Cursor(cursor) => self.search_cursor(cursor, filter, options),
        }
    }

    fn search_offset(
        &self,
        params: OffsetParams,
        filter: Option<TextFilter>,
        options: &SearchOptions,
    ) -> SearchEngineResult<SearchResult<Q::Row>> {
        let sorts = self.resolver.normalize_sorts(options, &params.sorts, false);
        let order = self.order_columns(options, &sorts)?;

        let total = if params.with_total {
            let count_plan = QueryPlan::new().filter(filter.clone());
            Some(self.source.count(&count_plan)?)
        } else {
            None
        };

        let plan = QueryPlan::new()
            .filter(filter)
            .order_by(order)
            .limit(params.page_size)
            .offset(params.offset());
        log::debug!("Offset page query: {plan:?}");
        let items = self.source.fetch(&plan)?;

        Ok(SearchResult::offset_page(
            items,
            params.page,
            params.page_size,
            total,
        ))
    }

    fn search_cursor(
        &self,
        params: CursorParams,
        filter: Option<TextFilter>,
        options: &SearchOptions,
    ) -> SearchEngineResult<SearchResult<Q::Row>> {
        let sorts = self.resolver.normalize_sorts(options, &params.sorts, true);
        let order = self.order_columns(options, &sorts)?;

        let keyset = match params.after.as_deref() {
            Some(after) => Some(self.resume_after(after, &sorts, &order)?),
            None => None,
        };

        let plan = QueryPlan::new()
            .filter(filter)
            .keyset(keyset)
            .order_by(order.clone())
            .limit(params.limit.saturating_add(1));
        log::debug!("Keyset page query: {plan:?}");
        let mut items = self.source.fetch(&plan)?;

        let has_next = items.len() > params.limit;
        items.truncate(params.limit);

        let next_cursor = match items.last() {
            Some(last) if has_next => Some(self.cursor_for(last, &sorts, &order)?),
            _ => None,
        };

        Ok(SearchResult::cursor_page(items, has_next, next_cursor))
    }

    fn order_columns(
        &self,
        options: &SearchOptions,
        sorts: &[SortParam],
    ) -> SearchEngineResult<Vec<OrderColumn>> {
        sorts
            .iter()
            .map(|sort| {
                self.resolver
                    .resolve_column(options, &sort.field)
                    .map(|column| OrderColumn {
                        column: column.to_string(),
                        direction: sort.direction,
                    })
                    .ok_or_else(|| SearchError::DisallowedSortField(sort.field.clone()))
            })
            .collect()
    }

    /// Verifies `after` and turns it into a keyset predicate for `sorts`.
    fn resume_after(
        &self,
        after: &str,
        sorts: &[SortParam],
        order: &[OrderColumn],
    ) -> SearchEngineResult<KeysetPredicate> {
        let token = self.signer.verify(after).map_err(|err| {
            log::debug!("Rejected cursor: {err}");
            SearchError::InvalidCursor(err)
        })?;

        if !token.matches_sorts(sorts) {
            log::debug!("Rejected cursor: sort order changed since it was issued");
            return Err(SearchError::InvalidCursor(CursorError::SortMismatch));
        }

        Ok(KeysetPredicate::strictly_after(
            order
                .iter()
                .zip(token.into_keys())
                .map(|(order, key)| (order.column.clone(), order.direction, key.value)),
        ))
    }

    fn cursor_for(
        &self,
        row: &Q::Row,
        sorts: &[SortParam],
        order: &[OrderColumn],
    ) -> SearchEngineResult<String> {
        let keys = sorts
            .iter()
            .zip(order)
            .map(|(sort, order)| {
                row.column_value(&order.column)
                    .map(|value| CursorKey::new(sort.field.clone(), sort.direction, value))
                    .ok_or_else(|| SearchError::MissingSortValue(order.column.clone()))
            })
            .collect::<SearchEngineResult<Vec<_>>>()?;

        Ok(self.signer.sign(&CursorToken::new(keys))?)
    }
}

fn text_filter(options: &SearchOptions, query: Option<String>) -> Option<TextFilter> {
    let term = query?;
    if options.text_searchable_columns().is_empty() {
        return None;
    }
    Some(TextFilter {
        columns: options.text_searchable_columns().to_vec(),
        term,
    })
}
