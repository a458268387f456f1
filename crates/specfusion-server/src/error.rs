//! Maps [`specfusion_core::Error`] onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use specfusion_core::Error as CoreError;

/// Wrapper so handlers can `.map_err(ApiError)?` and get a sensible
/// JSON error body with the right status code.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Auth => StatusCode::UNAUTHORIZED,
            CoreError::QualityGate { .. } => StatusCode::CONFLICT,
            CoreError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            CoreError::Config(_) | CoreError::Parse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.0.to_string(), "category": self.0.category() }));
        (status, body).into_response()
    }
}
