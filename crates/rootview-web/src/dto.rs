use std::time::{SystemTime, UNIX_EPOCH};

use rootview_core::{Catalog, DirEntryView, EntryDetails, EntryType, Listing, ResolvedPath};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawQuery {
    #[serde(default)]
    pub path: String,
    /// `1` asks for `Content-Disposition: attachment`.
    #[serde(default)]
    pub dl: Option<u8>,
}

impl RawQuery {
    pub fn download(&self) -> bool {
        self.dl.is_some_and(|v| v != 0)
    }
}

#[derive(Debug, Deserialize)]
pub struct MkdirRequest {
    #[serde(default)]
    pub path: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub path: String,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct EntryDto {
    pub name: String,
    /// Root-relative, `/`-separated.
    pub path: String,
    pub kind: EntryType,
    pub icon: String,
    pub color: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub modified: Option<u64>,
}

impl EntryDto {
    fn new(dir: &ResolvedPath, entry: &DirEntryView, catalog: &Catalog) -> Self {
        let appearance = catalog.types.appearance(entry.entry_type());
        Self {
            name: entry.name().to_string(),
            path: join_relative(&dir.relative_display(), entry.name()),
            kind: entry.entry_type(),
            icon: appearance.icon.clone(),
            color: appearance.color.clone(),
            is_dir: entry.is_dir(),
            is_symlink: entry.is_symlink(),
            size: entry.size(),
            modified: entry.modified().and_then(unix_secs),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub path: String,
    pub breadcrumbs: Vec<String>,
    /// `None` at the root.
    pub parent: Option<String>,
    /// Everything except images, directories first.
    pub entries: Vec<EntryDto>,
    pub images: Vec<EntryDto>,
    /// How many of `images` the client should render as thumbnails.
    pub preview_limit: usize,
    pub dir_count: usize,
    pub file_count: usize,
    pub total_size: u64,
    pub summary: String,
}

impl ListingResponse {
    pub fn new(dir: &ResolvedPath, listing: &Listing, catalog: &Catalog, preview_limit: usize) -> Self {
        let breadcrumbs = dir.breadcrumbs();
        let parent = (!dir.is_root()).then(|| {
            breadcrumbs[..breadcrumbs.len().saturating_sub(1)].join("/")
        });
        Self {
            path: dir.relative_display(),
            parent,
            entries: listing
                .directories()
                .chain(listing.others())
                .map(|e| EntryDto::new(dir, e, catalog))
                .collect(),
            images: listing.images().map(|e| EntryDto::new(dir, e, catalog)).collect(),
            preview_limit,
            dir_count: listing.dir_count(),
            file_count: listing.file_count(),
            total_size: listing.total_size(),
            summary: listing.summary(),
            breadcrumbs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetailsResponse {
    pub name: String,
    pub path: String,
    pub kind: EntryType,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub created: Option<u64>,
    pub modified: Option<u64>,
    pub accessed: Option<u64>,
    pub permissions: String,
    pub readonly: bool,
}

impl DetailsResponse {
    pub fn new(relative: String, details: EntryDetails) -> Self {
        Self {
            name: details.name,
            path: relative,
            kind: details.entry_type,
            is_dir: details.is_dir,
            is_symlink: details.is_symlink,
            size: details.size,
            created: details.created.and_then(unix_secs),
            modified: details.modified.and_then(unix_secs),
            accessed: details.accessed.and_then(unix_secs),
            permissions: details.permissions,
            readonly: details.readonly,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub success: bool,
    pub path: String,
}

impl PathResponse {
    pub fn ok(path: String) -> Self {
        Self { success: true, path }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub saved: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn unix_secs(t: SystemTime) -> Option<u64> {
    t.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}
