use crate::stores::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Transport-level error: an HTTP status, an S3-style error code and a message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status, code and message.
    pub fn new(status: StatusCode, code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: msg.into(),
        }
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidRequest", msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let (status, code) = match &err {
            StoreError::BucketAlreadyExists(_) => (StatusCode::CONFLICT, "BucketAlreadyExists"),
            StoreError::BucketNotFound(_) => (StatusCode::NOT_FOUND, "NoSuchBucket"),
            StoreError::ObjectAlreadyExists { .. } => (StatusCode::CONFLICT, "ObjectAlreadyExists"),
            StoreError::ObjectNotFound { .. } => (StatusCode::NOT_FOUND, "NoSuchKey"),
            StoreError::ObjectNotInBucket { .. } => (StatusCode::FORBIDDEN, "AccessDenied"),
            StoreError::InvalidBucketName { .. } => (StatusCode::BAD_REQUEST, "InvalidBucketName"),
            StoreError::InvalidObjectKey => (StatusCode::BAD_REQUEST, "InvalidArgument"),
            StoreError::StorageUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable")
            }
        };
        AppError::new(status, code, err.to_string())
    }
}
