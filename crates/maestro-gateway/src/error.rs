//! Mapping from engine errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use maestro_core::MaestroError;
use tracing::error;

/// Wrapper that renders a [`MaestroError`] as a JSON error response with
/// the status code of its failure class.
#[derive(Debug)]
pub struct ApiError(pub MaestroError);

impl ApiError {
    /// Status classification of the error taxonomy: routing failures are
    /// "not found", a contended gate is "service unavailable" (and worth
    /// retrying), a missed deadline is "request timeout"; everything else
    /// is an internal error.
    pub fn status_code(error: &MaestroError) -> StatusCode {
        match error {
            MaestroError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MaestroError::Routing(_) => StatusCode::NOT_FOUND,
            MaestroError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            MaestroError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MaestroError> for ApiError {
    fn from(error: MaestroError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = Self::status_code(&self.0);
        error!(status = %status, error = %self.0, "Request failed");
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let cases = [
            (MaestroError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (MaestroError::Routing("x".into()), StatusCode::NOT_FOUND),
            (MaestroError::Timeout("x".into()), StatusCode::REQUEST_TIMEOUT),
            (MaestroError::Busy("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (MaestroError::Task("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (MaestroError::Http("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (MaestroError::Extraction("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError::status_code(&error), expected, "{error}");
        }
    }
}
