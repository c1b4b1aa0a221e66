use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::shared::exotel::ToolError;
use crate::shared::http::VendorErrorKind;
use crate::shared::models::DatabaseError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    Upstream(String),
    Database(DatabaseError),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Database(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            ),
            ApiError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", e),
            ),
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        ApiError::Database(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<ToolError> for ApiError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::Auth(err) => ApiError::Unauthorized(err.to_string()),
            ToolError::Vendor(err) => match err.kind {
                // The vendor rejected the request as malformed; that is the
                // caller's problem, not a gateway fault
                VendorErrorKind::ClientError(_) => ApiError::BadRequest(err.to_string()),
                _ => ApiError::Upstream(err.to_string()),
            },
            ToolError::Database(err) => ApiError::Database(err),
        }
    }
}
