//! Directory listing with classification, ordering and aggregates.

use std::cmp::Ordering;
use std::path::Path;

use crate::catalog::Catalog;
use crate::error::{CoreError, CoreResult};
use crate::fs::entry::DirEntryView;

/// The result of scanning one directory.
///
/// Entries are ordered directories first, then files, each group sorted
/// case-insensitively by name. Aggregates only count what is in `entries`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Listing {
    entries: Vec<DirEntryView>,
    dir_count: usize,
    file_count: usize,
    total_size: u64,
}

impl Listing {
    /// All visible entries in display order.
    pub fn entries(&self) -> &[DirEntryView] {
        &self.entries
    }

    /// Image files, in display order.
    pub fn images(&self) -> impl Iterator<Item = &DirEntryView> {
        self.entries.iter().filter(|e| !e.is_dir() && e.is_image())
    }

    /// Non-image files, in display order.
    pub fn others(&self) -> impl Iterator<Item = &DirEntryView> {
        self.entries.iter().filter(|e| !e.is_dir() && !e.is_image())
    }

    /// Directories, in display order.
    pub fn directories(&self) -> impl Iterator<Item = &DirEntryView> {
        self.entries.iter().filter(|e| e.is_dir())
    }

    pub fn dir_count(&self) -> usize {
        self.dir_count
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Sum of file sizes in bytes; directories contribute nothing.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-line status text, e.g. `"2 folders, 3 files, 1.5 KB"`.
    pub fn summary(&self) -> String {
        format!(
            "{} folders, {} files, {}",
            self.dir_count,
            self.file_count,
            format_size(self.total_size)
        )
    }
}

/// Scans the direct children of `path` into a [`Listing`].
///
/// Hidden entries (see [`crate::catalog::HiddenNames`]) are skipped. Each
/// remaining entry is stat'ed following symlinks; an entry that vanished or
/// cannot be stat'ed (a dangling link, say) is dropped without failing the
/// listing.
///
/// # Errors
///
/// - [`CoreError::NotFound`]: the path does not exist.
/// - [`CoreError::NotADirectory`]: the path is not a directory.
/// - [`CoreError::PermissionDenied`]: the directory cannot be enumerated.
/// - [`CoreError::Io`]: any other I/O error opening the directory.
pub fn list_directory(path: &Path, catalog: &Catalog) -> CoreResult<Listing> {
    let meta = std::fs::metadata(path).map_err(|e| CoreError::from_io(path, e))?;
    if !meta.is_dir() {
        return Err(CoreError::NotADirectory(path.to_path_buf()));
    }

    let read_dir = std::fs::read_dir(path).map_err(|e| CoreError::from_io(path, e))?;

    let mut entries = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = match dir_entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(dir = %path.display(), "skipping unreadable entry: {e}");
                continue;
            }
        };

        let file_name = dir_entry.file_name();
        if catalog.hidden.is_hidden(&file_name.to_string_lossy()) {
            continue;
        }

        let entry_path = dir_entry.path();
        let metadata = match std::fs::metadata(&entry_path) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(entry = %entry_path.display(), "skipping entry: {e}");
                continue;
            }
        };
        let is_symlink = dir_entry
            .file_type()
            .map(|ft| ft.is_symlink())
            .unwrap_or(false);

        entries.push(DirEntryView::new(
            entry_path,
            &metadata,
            is_symlink,
            &catalog.types,
        ));
    }

    entries.sort_by(display_order);

    let mut listing = Listing::default();
    for entry in &entries {
        if entry.is_dir() {
            listing.dir_count += 1;
        } else {
            listing.file_count += 1;
            listing.total_size += entry.size();
        }
    }
    listing.entries = entries;

    tracing::debug!(
        dir = %path.display(),
        dirs = listing.dir_count,
        files = listing.file_count,
        "listed directory"
    );

    Ok(listing)
}

/// Directories first, then case-insensitive name, then exact name.
fn display_order(a: &DirEntryView, b: &DirEntryView) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
        .then_with(|| a.name().cmp(b.name()))
}

/// Formats a byte count with binary units and one decimal place.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
