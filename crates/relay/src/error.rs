use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// JSON error body. The field name matches what the client looks for first.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub erro: String,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RelayError::BadRequest(message) => {
                tracing::debug!(message = %message, "bad request");
                (StatusCode::BAD_REQUEST, message)
            }
            RelayError::NotFound(message) => {
                tracing::debug!(message = %message, "not found");
                (StatusCode::NOT_FOUND, message)
            }
        };
        (status, Json(ErrorResponse { erro: message })).into_response()
    }
}
