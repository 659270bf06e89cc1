//! DTOs exposed by the JSON search endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::search::params::PaginationInput;

/// Body of `POST /api/v1/hubs/{hub_id}/<entity>/search`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    #[validate(nested)]
    pub pagination: PaginationInput,
    /// Optional free-form search string matched against text columns.
    #[validate(length(max = 200))]
    pub query: Option<String>,
}

/// Error payload returned with every non-2xx response.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
