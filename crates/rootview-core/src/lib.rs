//! rootview core library: a root-confined file-browsing engine.
//!
//! `rootview-core` holds everything a front end needs to browse one
//! directory tree safely. It performs no rendering and installs no logging
//! subscriber; the web server (`rootview-web`) and tests drive it directly.
//!
//! # Modules
//!
//! - [`fs`]: Path resolution confined to a root, directory listing, entry operations.
//! - [`catalog`]: Extension table ([`TypeTable`]), icons and colors, hidden names.
//! - [`thumbnail`]: Persistent, bounded, single-flight [`ThumbnailCache`].
//! - [`browser`]: [`Browser`], one session bound to a root.
//! - [`config`]: TOML configuration ([`Config`]).
//! - [`error`]: Unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod browser;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fs;
pub mod thumbnail;

pub use browser::Browser;
pub use catalog::{Appearance, Catalog, EntryType, HiddenNames, TypeSpec, TypeTable};
pub use config::{BrowseConfig, Config, ThumbnailSettings};
pub use error::{CoreError, CoreResult, ThumbnailError};
pub use fs::{DirEntryView, EntryDetails, Listing, ResolvedPath, Root};
pub use thumbnail::{CacheKey, Thumbnail, ThumbnailCache, ThumbnailGenerator};

/// Normalises a string to NFC (composed) form.
///
/// macOS stores filenames in NFD (decomposed), which makes composed
/// characters such as Hangul syllables render as separate jamo. This helper
/// re-composes them.
pub fn nfc_string(s: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    s.nfc().collect()
}
