//! Error mapping for callers exposing flashcard-ai over HTTP
//!
//! Converts `ServiceError` values into response statuses, and classifies
//! upstream status codes for logging.

use reqwest::StatusCode;

use super::ServiceError;

/// Map an error to the status a caller should answer with
///
/// Upstream failures become 502 (504 for timeouts), caller mistakes 400.
pub fn http_status(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::InvalidSystemMessage
        | ServiceError::InvalidUserMessage
        | ServiceError::InvalidResponseFormat(_)
        | ServiceError::InvalidModelName
        | ServiceError::MissingUserMessage
        | ServiceError::Validation(_)
        | ServiceError::InvalidSourceText(_)
        | ServiceError::InvalidGenerationId(_) => StatusCode::BAD_REQUEST,
        ServiceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ServiceError::Api { .. }
        | ServiceError::Network(_)
        | ServiceError::EmptyResponse
        | ServiceError::MaxRetriesExceeded { .. }
        | ServiceError::InvalidGenerationResponse(_) => StatusCode::BAD_GATEWAY,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Configuration(_) | ServiceError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Build the JSON error body a caller should answer with
pub fn error_body(error: &ServiceError) -> serde_json::Value {
    serde_json::json!({
        "error": error.to_string(),
        "code": error.code(),
    })
}

/// Helper function to classify upstream HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "validation",
        401 => "authentication",
        402 => "payment_required",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}
