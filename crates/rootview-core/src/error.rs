//! Error types for `rootview-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`. Thumbnail generation has its
//! own cloneable [`ThumbnailError`] because one failure is handed to every
//! caller waiting on the same generation.

use std::path::{Path, PathBuf};

/// Unified error type for all core operations.
///
/// Each variant captures just enough context for the caller to display
/// a meaningful message or map it onto a front-end status.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested path resolves outside the browsing root.
    #[error("path escapes root: {0}")]
    Containment(String),

    /// The target path does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// The process lacks permission to access the path.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A directory was expected but the path points to a file.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A file or directory name is invalid (empty, contains path separators, etc.).
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The target of a create or rename already exists.
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Failed to parse or validate a TOML configuration file.
    #[error("config error: {0}")]
    Config(String),

    /// A thumbnail could not be produced.
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    /// An I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Maps an I/O error on `path` onto the matching variant.
    ///
    /// `NotFound` and `PermissionDenied` keep the offending path; every other
    /// kind is wrapped as [`CoreError::Io`].
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => CoreError::PermissionDenied(path.to_path_buf()),
            _ => CoreError::Io(err),
        }
    }
}

/// Failure to produce a preview thumbnail.
///
/// Reported per image; it never fails the surrounding listing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThumbnailError {
    /// The source image does not exist (or vanished before it was read).
    #[error("thumbnail source missing: {0}")]
    SourceMissing(PathBuf),

    /// The source could not be decoded, or the preview could not be encoded.
    #[error("thumbnail generation failed: {0}")]
    Decode(String),

    /// The thumbnail store could not be read or written.
    #[error("thumbnail store error: {0}")]
    Store(String),

    /// The background worker panicked or was shut down.
    #[error("thumbnail worker failed: {0}")]
    Worker(String),
}

/// Convenience alias used throughout `rootview-core`.
pub type CoreResult<T> = Result<T, CoreError>;
