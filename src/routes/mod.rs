use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};

use crate::dto::api::ApiError;
use crate::services::ServiceError;

pub mod api;

/// Maps a service failure to its HTTP status and JSON error body.
///
/// Server-side failures keep their code but not their details.
pub fn error_response(err: &ServiceError) -> HttpResponse {
    if err.is_client_error() {
        HttpResponse::BadRequest().json(ApiError::new(err.code(), err.to_string()))
    } else {
        HttpResponse::InternalServerError()
            .json(ApiError::new(err.code(), "internal server error"))
    }
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected request body: {err}");
    let body = ApiError::new("VALIDATION_ERROR", err.to_string());
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

/// JSON extractor settings reporting malformed bodies as [`ApiError`]s.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error_handler)
}
