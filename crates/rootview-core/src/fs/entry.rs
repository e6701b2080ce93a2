//! Directory entry representation.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use unicode_normalization::UnicodeNormalization;

use crate::catalog::{EntryType, TypeTable};

/// A single classified file or directory entry, as shown in a listing.
///
/// `DirEntryView` is immutable and produced fresh on every listing; it is
/// never cached. Directory sizes are reported as `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryView {
    path: PathBuf,
    name: String,
    entry_type: EntryType,
    size: u64,
    modified: Option<SystemTime>,
    is_dir: bool,
    is_symlink: bool,
}

impl DirEntryView {
    /// Creates an entry from a path and its (symlink-followed) metadata.
    ///
    /// The name is NFC-normalized before it is classified with `types`.
    pub fn new(
        path: PathBuf,
        metadata: &std::fs::Metadata,
        is_symlink: bool,
        types: &TypeTable,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().nfc().collect::<String>())
            .unwrap_or_default();
        let is_dir = metadata.is_dir();

        Self {
            entry_type: types.classify(&name, is_dir),
            path,
            name,
            size: if is_dir { 0 } else { metadata.len() },
            modified: metadata.modified().ok(),
            is_dir,
            is_symlink,
        }
    }

    /// Returns the full path of this entry.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file or directory name (last component of the path).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the semantic category of this entry.
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Returns the file size in bytes. Always `0` for directories.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the last-modified time, if available.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Returns `true` if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Returns `true` if the entry itself is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    /// Returns `true` if this entry is an image file.
    pub fn is_image(&self) -> bool {
        self.entry_type == EntryType::Image
    }
}
