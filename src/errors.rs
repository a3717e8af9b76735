use crate::services::{
    draft_repository::RepositoryError, draft_workflow::DraftError, media_store::StorageError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// HTTP-facing error: a status plus the message shown to the user.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
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
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let status = match &err {
            StorageError::ObjectNotFound { .. } => StatusCode::NOT_FOUND,
            StorageError::ObjectAlreadyExists { .. } => StatusCode::CONFLICT,
            StorageError::InvalidObjectKey | StorageError::InvalidBucketName { .. } => {
                StatusCode::BAD_REQUEST
            }
            StorageError::Unauthorized => StatusCode::FORBIDDEN,
            StorageError::Sqlx(_) | StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::Validation(msg) => AppError::bad_request(msg),
            DraftError::Upload(err) => err.into(),
            DraftError::Insert(err) | DraftError::Repository(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_map_to_statuses() {
        let validation: AppError = DraftError::Validation("Title is required.".into()).into();
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.message, "Title is required.");

        let collision: AppError = DraftError::Upload(StorageError::ObjectAlreadyExists {
            bucket: "post-media".into(),
            key: "1-a.png".into(),
        })
        .into();
        assert_eq!(collision.status, StatusCode::CONFLICT);
        assert!(collision.message.contains("1-a.png"));

        let insert: AppError =
            DraftError::Insert(RepositoryError::Sqlx(sqlx::Error::PoolClosed)).into();
        assert_eq!(insert.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
