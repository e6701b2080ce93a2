use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rootview_core::{CoreError, ThumbnailError};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(msg) => {
                // Log the real error server-side, return generic message to client
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::BadRequest(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Unprocessable(msg) => msg,
        };

        let body = ErrorBody {
            success: false,
            error: message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            // Client messages never echo absolute server paths.
            CoreError::Containment(_) => AppError::Forbidden("Access denied".to_string()),
            CoreError::PermissionDenied(_) => AppError::Forbidden("Permission denied".to_string()),
            CoreError::NotFound(_) => AppError::NotFound("Path not found".to_string()),
            CoreError::NotADirectory(_) => AppError::BadRequest("Not a directory".to_string()),
            CoreError::InvalidName(name) => AppError::BadRequest(format!("Invalid name: {name}")),
            CoreError::AlreadyExists(path) => AppError::Conflict(format!(
                "Already exists: {}",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            )),
            CoreError::Thumbnail(ThumbnailError::SourceMissing(_)) => {
                AppError::NotFound("Image not found".to_string())
            }
            CoreError::Thumbnail(ThumbnailError::Decode(msg)) => {
                tracing::debug!("thumbnail decode failed: {msg}");
                AppError::Unprocessable("Cannot generate a preview for this file".to_string())
            }
            CoreError::Thumbnail(other) => AppError::Internal(other.to_string()),
            CoreError::Config(msg) => AppError::Internal(format!("config: {msg}")),
            CoreError::Io(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {e}"))
    }
}
