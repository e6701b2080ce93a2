use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use rootview_core::CoreError;

use crate::api::blocking;
use crate::dto::PathQuery;
use crate::error::AppError;
use crate::state::AppState;

/// Serves the cached preview of an image, generating it on first request.
pub async fn thumbnail(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Response, AppError> {
    let browser = state.browser.clone();
    let path = query.path.clone();
    let source = blocking(move || browser.resolve(&path)).await?;
    let thumb = state
        .browser
        .thumbnails()
        .get_or_create(source.path())
        .await
        .map_err(CoreError::from)?;

    let etag = HeaderValue::from_str(&format!("\"{}\"", thumb.key()))
        .map_err(|e| AppError::Internal(format!("invalid etag: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(thumb.content_type())),
            (header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=3600")),
            (header::ETAG, etag),
        ],
        thumb.data().to_vec(),
    )
        .into_response())
}
