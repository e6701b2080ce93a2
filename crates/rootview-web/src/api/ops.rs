use axum::extract::{Multipart, Query, State};
use axum::Json;

use crate::api::blocking;
use crate::dto::{
    DeleteRequest, MkdirRequest, PathQuery, PathResponse, RenameRequest, SuccessResponse,
    UploadResponse,
};
use crate::error::AppError;
use crate::state::AppState;

/// Saves every `files[]` part into the directory named by `path`.
pub async fn upload(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut saved = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if !matches!(field.name(), Some("files[]" | "files")) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if file_name.is_empty() {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Upload interrupted: {e}")))?;

        let browser = state.browser.clone();
        let dir = query.path.clone();
        let target = blocking(move || browser.upload(&dir, &file_name, &bytes)).await?;
        saved.push(target.relative_display());
    }

    if saved.is_empty() {
        return Err(AppError::BadRequest("No files selected".to_string()));
    }
    tracing::info!(dir = %query.path, count = saved.len(), "upload complete");
    Ok(Json(UploadResponse {
        success: true,
        saved,
    }))
}

pub async fn mkdir(
    State(state): State<AppState>,
    Json(req): Json<MkdirRequest>,
) -> Result<Json<PathResponse>, AppError> {
    let browser = state.browser.clone();
    let created = blocking(move || browser.create_folder(&req.path, &req.name)).await?;
    Ok(Json(PathResponse::ok(created.relative_display())))
}

pub async fn rename(
    State(state): State<AppState>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<PathResponse>, AppError> {
    let browser = state.browser.clone();
    let renamed = blocking(move || browser.rename(&req.path, &req.new_name)).await?;
    Ok(Json(PathResponse::ok(renamed.relative_display())))
}

pub async fn delete(
    State(state): State<AppState>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let browser = state.browser.clone();
    blocking(move || browser.delete(&req.path)).await?;
    Ok(Json(SuccessResponse { success: true }))
}
