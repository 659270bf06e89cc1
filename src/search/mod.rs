//! Pagination and cursor-signing engine shared by every list endpoint.
//!
//! Requests flow through [`params::PaginationParams`] normalization, the
//! [`sort::SortResolver`] allowlist, and finally [`engine::SearchEngine`],
//! which pages a [`engine::QueryableSource`] by offset or by signed cursor.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

pub mod cursor;
pub mod engine;
pub mod errors;
pub mod memory;
pub mod params;
pub mod predicate;
pub mod sort;

use crate::search::params::PaginationParams;
use crate::search::sort::{SortParam, TieBreaker};

/// Misconfiguration detected while building [`SearchOptions`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchOptionsError {
    #[error("at least one default sort is required")]
    EmptyDefaults,

    #[error("default sort field is not allowlisted: {0}")]
    UnknownDefaultField(String),

    #[error("tie-breaker field is not allowlisted: {0}")]
    UnknownTieBreakerField(String),

    #[error("invalid column name: {0}")]
    InvalidColumnName(String),
}

/// Server-authored search configuration of one entity.
#[derive(Clone, Debug)]
pub struct SearchOptions {
    allowed_fields: HashMap<String, String>,
    default_sorts: Vec<SortParam>,
    tie_breaker: Option<TieBreaker>,
    text_searchable_columns: Vec<String>,
}

impl SearchOptions {
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }

    /// Storage column for a logical field, if allowlisted.
    pub fn column_for(&self, field: &str) -> Option<&str> {
        self.allowed_fields.get(field).map(String::as_str)
    }

    pub fn default_sorts(&self) -> &[SortParam] {
        &self.default_sorts
    }

    pub fn tie_breaker(&self) -> Option<&TieBreaker> {
        self.tie_breaker.as_ref()
    }

    pub fn text_searchable_columns(&self) -> &[String] {
        &self.text_searchable_columns
    }
}

#[derive(Debug, Default)]
pub struct SearchOptionsBuilder {
    allowed_fields: HashMap<String, String>,
    default_sorts: Vec<SortParam>,
    tie_breaker: Option<TieBreaker>,
    text_searchable_columns: Vec<String>,
}

impl SearchOptionsBuilder {
    pub fn allow(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.allowed_fields.insert(field.into(), column.into());
        self
    }

    pub fn default_sort(mut self, sort: SortParam) -> Self {
        self.default_sorts.push(sort);
        self
    }

    pub fn tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = Some(tie_breaker);
        self
    }

    pub fn text_searchable(mut self, column: impl Into<String>) -> Self {
        self.text_searchable_columns.push(column.into());
        self
    }

    pub fn build(self) -> Result<SearchOptions, SearchOptionsError> {
        let columns = self
            .allowed_fields
            .values()
            .chain(self.text_searchable_columns.iter());
        for column in columns {
            validate_column_name(column)?;
        }

        if self.default_sorts.is_empty() {
            return Err(SearchOptionsError::EmptyDefaults);
        }
        if let Some(sort) = self
            .default_sorts
            .iter()
            .find(|sort| !self.allowed_fields.contains_key(&sort.field))
        {
            return Err(SearchOptionsError::UnknownDefaultField(sort.field.clone()));
        }
        if let Some(tie_breaker) = &self.tie_breaker
            && !self.allowed_fields.contains_key(&tie_breaker.tie_breaker)
        {
            return Err(SearchOptionsError::UnknownTieBreakerField(
                tie_breaker.tie_breaker.clone(),
            ));
        }

        Ok(SearchOptions {
            allowed_fields: self.allowed_fields,
            default_sorts: self.default_sorts,
            tie_breaker: self.tie_breaker,
            text_searchable_columns: self.text_searchable_columns,
        })
    }
}

/// Accepts `[A-Za-z_][A-Za-z0-9_.]*`, so column names can be written into SQL.
fn validate_column_name(name: &str) -> Result<(), SearchOptionsError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(SearchOptionsError::InvalidColumnName(name.to_string()))
    }
}

/// A single list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchParams {
    pub pagination: PaginationParams,
    pub query: Option<String>,
}

impl SearchParams {
    pub fn new(pagination: PaginationParams) -> Self {
        Self {
            pagination,
            query: None,
        }
    }

    /// Sets the free-text query; blank strings are treated as absent.
    pub fn query(mut self, query: Option<impl Into<String>>) -> Self {
        self.query = query
            .map(|q| q.into().trim().to_string())
            .filter(|q| !q.is_empty());
        self
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// A page of results plus continuation metadata.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
}

impl<T> SearchResult<T> {
    pub fn offset_page(items: Vec<T>, page: usize, page_size: usize, total: Option<usize>) -> Self {
        Self {
            items,
            total,
            page: Some(page),
            page_size: Some(page_size),
            page_info: None,
        }
    }

    pub fn cursor_page(items: Vec<T>, has_next: bool, next_cursor: Option<String>) -> Self {
        Self {
            items,
            total: None,
            page: None,
            page_size: None,
            page_info: Some(PageInfo {
                has_next,
                next_cursor,
            }),
        }
    }

    /// Converts the items while keeping the pagination metadata.
    pub fn map<U, F>(self, f: F) -> SearchResult<U>
    where
        F: FnMut(T) -> U,
    {
        SearchResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            page_info: self.page_info,
        }
    }
}
