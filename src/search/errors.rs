use thiserror::Error;

use crate::repository::errors::RepositoryError;
use crate::search::cursor::CursorError;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    #[error("sort field is not allowed: {0}")]
    DisallowedSortField(String),

    #[error("row has no value for sort column {0}")]
    MissingSortValue(String),

    #[error("query failed: {0}")]
    QueryFailed(#[from] RepositoryError),
}

impl SearchError {
    /// Stable, client-visible error code.
    pub const fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidCursor(_) => "INVALID_CURSOR",
            SearchError::DisallowedSortField(_) => "INVALID_SORT_FIELD",
            SearchError::MissingSortValue(_) => "SORT_VALUE_MISSING",
            SearchError::QueryFailed(_) => "QUERY_FAILED",
        }
    }

    /// Whether the failure was caused by the request rather than the server.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::InvalidCursor(_) | SearchError::DisallowedSortField(_)
        )
    }
}

pub type SearchEngineResult<T> = Result<T, SearchError>;
