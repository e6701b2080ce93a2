use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Json;

use crate::api::blocking;
use crate::dto::{DetailsResponse, ListingResponse, PathQuery, RawQuery};
use crate::error::AppError;
use crate::state::AppState;

pub async fn list_directory(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ListingResponse>, AppError> {
    let browser = state.browser.clone();
    let response = blocking(move || {
        let (dir, listing) = browser.list(&query.path)?;
        Ok(ListingResponse::new(
            &dir,
            &listing,
            &browser.catalog(),
            browser.max_image_previews(),
        ))
    })
    .await?;
    Ok(Json(response))
}

/// Streams a file's bytes. `dl=1` turns the response into a download.
pub async fn raw_file(
    State(state): State<AppState>,
    Query(query): Query<RawQuery>,
) -> Result<Response, AppError> {
    let browser = state.browser.clone();
    let path = query.path.clone();
    let target = blocking(move || browser.resolve(&path)).await?;

    let metadata = tokio::fs::metadata(target.path())
        .await
        .map_err(|e| AppError::from(rootview_core::CoreError::from_io(target.path(), e)))?;
    if metadata.is_dir() {
        return Err(AppError::BadRequest("Cannot download a directory".to_string()));
    }

    let file = tokio::fs::File::open(target.path())
        .await
        .map_err(|e| AppError::from(rootview_core::CoreError::from_io(target.path(), e)))?;

    let mime = mime_guess::from_path(target.path()).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len());

    if query.download() {
        let name = target
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string());
        builder = builder.header(header::CONTENT_DISPOSITION, attachment_header(&name));
    }

    let body = Body::from_stream(tokio_util::io::ReaderStream::new(file));
    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

pub async fn details(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<DetailsResponse>, AppError> {
    let browser = state.browser.clone();
    let response = blocking(move || {
        let target = browser.resolve(&query.path)?;
        let details = browser.details(&query.path)?;
        Ok(DetailsResponse::new(target.relative_display(), details))
    })
    .await?;
    Ok(Json(response))
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// UTF-8 name.
fn attachment_header(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let encoded: String = name
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect();
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
