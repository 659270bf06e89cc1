use thiserror::Error;

use crate::search::errors::SearchError;

pub mod search;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ServiceError {
    /// Stable, client-visible error code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Search(err) => err.code(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Validation(_) => true,
            ServiceError::Search(err) => err.is_client_error(),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
