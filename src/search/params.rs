//! Canonical pagination input.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::search::sort::SortParam;

/// Provisional page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaginationMode {
    Offset,
    Cursor,
}

/// Pagination fields as accepted from any transport, before normalization.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInput {
    pub mode: Option<PaginationMode>,
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1))]
    pub page_size: Option<usize>,
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
    pub after: Option<String>,
    #[serde(default)]
    pub sorts: Vec<SortParam>,
    pub with_total: Option<bool>,
}

impl PaginationInput {
    fn resolved_mode(&self) -> PaginationMode {
        match self.mode {
            Some(mode) => mode,
            None if self.after.is_some() || self.limit.is_some() => PaginationMode::Cursor,
            None => PaginationMode::Offset,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetParams {
    pub page: usize,
    pub page_size: usize,
    pub sorts: Vec<SortParam>,
    pub with_total: bool,
}

impl OffsetParams {
    /// Number of rows skipped before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CursorParams {
    pub limit: usize,
    /// Still-encoded cursor; verified by the search engine.
    pub after: Option<String>,
    pub sorts: Vec<SortParam>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaginationParams {
    Offset(OffsetParams),
    Cursor(CursorParams),
}

impl PaginationParams {
    /// Normalizes `input` with [`DEFAULT_PAGE_SIZE`].
    pub fn normalize(input: PaginationInput, default_sorts: &[SortParam]) -> Self {
        Self::normalize_with(input, default_sorts, DEFAULT_PAGE_SIZE)
    }

    /// Fills in defaults and picks the pagination variant.
    ///
    /// Only defaults are supplied here; upper bounds are the caller's concern.
    pub fn normalize_with(
        input: PaginationInput,
        default_sorts: &[SortParam],
        default_page_size: usize,
    ) -> Self {
        let mode = input.resolved_mode();
        let default_page_size = default_page_size.max(1);
        let sorts = if input.sorts.is_empty() {
            default_sorts.to_vec()
        } else {
            input.sorts
        };

        match mode {
            PaginationMode::Offset => PaginationParams::Offset(OffsetParams {
                page: input.page.unwrap_or(1).max(1),
                page_size: input.page_size.unwrap_or(default_page_size).max(1),
                sorts,
                with_total: input.with_total.unwrap_or(false),
            }),
            PaginationMode::Cursor => PaginationParams::Cursor(CursorParams {
                limit: input.limit.unwrap_or(default_page_size).max(1),
                after: input
                    .after
                    .map(|after| after.trim().to_string())
                    .filter(|after| !after.is_empty()),
                sorts,
            }),
        }
    }

    pub fn mode(&self) -> PaginationMode {
        match self {
            PaginationParams::Offset(_) => PaginationMode::Offset,
            PaginationParams::Cursor(_) => PaginationMode::Cursor,
        }
    }

    pub fn sorts(&self) -> &[SortParam] {
        match self {
            PaginationParams::Offset(params) => &params.sorts,
            PaginationParams::Cursor(params) => &params.sorts,
        }
    }
}
