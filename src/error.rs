// Application error type and its conversion into HTTP responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::booking::BookingError;
use crate::erp_api::ErpError;
use crate::search::SearchFailure;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    // Validation failures are blocked before any ERP call
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("ERP error")]
    Upstream(#[from] ErpError),

    #[error("vehicle search failed: {}", .0.message)]
    SearchFailed(SearchFailure),
}

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        AppError::BadRequest(error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InternalServerError(e) => {
                // Log the detailed error here, don't expose it to the client
                tracing::error!("Internal server error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::BadRequest(message) => {
                tracing::info!("Rejected request: {}", message);
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            AppError::Unauthorized(message) => {
                tracing::warn!("Unauthorized access attempt: {}", message);
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            AppError::Forbidden(message) => {
                tracing::warn!("Forbidden: {}", message);
                (StatusCode::FORBIDDEN, json!({ "error": message }))
            }
            AppError::Upstream(ErpError::Status { status, excerpt, .. }) => {
                tracing::error!(status, "ERP returned an error: {}", excerpt);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": format!("ERP responded with HTTP {status}"), "status": status, "detail": excerpt }),
                )
            }
            AppError::Upstream(ErpError::Transport(e)) => {
                tracing::error!("ERP unreachable: {}", e);
                (StatusCode::BAD_GATEWAY, json!({ "error": e.to_string() }))
            }
            AppError::SearchFailed(failure) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": failure.message, "status": failure.status }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

// Define a custom Result type using our AppError
pub type AppResult<T> = Result<T, AppError>;
