pub mod files;
pub mod ops;
pub mod thumbnails;

use axum::routing::{get, post};
use axum::Router;
use rootview_core::CoreResult;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files", get(files::list_directory))
        .route("/raw", get(files::raw_file))
        .route("/details", get(files::details))
        .route("/thumbnail", get(thumbnails::thumbnail))
        .route("/upload", post(ops::upload))
        .route("/mkdir", post(ops::mkdir))
        .route("/rename", post(ops::rename))
        .route("/delete", post(ops::delete))
}

/// Runs a filesystem-bound core call off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}
