//! HTTP error mapping for the resource server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use aap_core::AapError;

/// Wire wrapper turning the core taxonomy into error bodies.
#[derive(Debug)]
pub struct ApiError(pub AapError);

impl From<AapError> for ApiError {
    fn from(error: AapError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.0.code().to_string(),
            error_description: self.0.description().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// `{error, error_description}` response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: String,
}
