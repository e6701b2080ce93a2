//! Engine configuration loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration rooted at `$HOME`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{default_hidden_names, default_specs, Catalog, HiddenNames, TypeSpec, TypeTable};
use crate::error::{CoreError, CoreResult};

/// Top-level engine configuration.
///
/// Call [`Config::load`] to read from a TOML path, then
/// [`Config::validate`] (or [`crate::Browser::new`], which validates) before
/// use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browse: BrowseConfig,
    #[serde(default)]
    pub thumbnails: ThumbnailSettings,
    /// Extension table; replaces the built-in one entirely when present.
    #[serde(default = "default_specs")]
    pub file_types: Vec<TypeSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browse: BrowseConfig::default(),
            thumbnails: ThumbnailSettings::default(),
            file_types: default_specs(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the file does not exist.
    /// - [`CoreError::PermissionDenied`] if the file is not readable.
    /// - [`CoreError::Config`] if the TOML is malformed.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::from_io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Checks the values that serde cannot: extension table consistency and
    /// non-zero preview dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] describing the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        TypeTable::new(self.file_types.clone())?;
        if self.thumbnails.max_width == 0 || self.thumbnails.max_height == 0 {
            return Err(CoreError::Config(
                "thumbnail dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the validated classification catalog.
    pub fn catalog(&self) -> CoreResult<Catalog> {
        let types = TypeTable::new(self.file_types.clone())?;
        let hidden = HiddenNames::new(self.browse.hidden_names.iter().cloned());
        Ok(Catalog::new(types, hidden))
    }
}

/// Root directory and listing preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Create `root` at startup if it does not exist.
    #[serde(default)]
    pub create_root: bool,
    /// Names hidden in addition to dot-files.
    #[serde(default = "default_hidden_names")]
    pub hidden_names: Vec<String>,
    /// Upper bound on image previews a front end renders per listing.
    #[serde(default = "default_max_image_previews")]
    pub max_image_previews: usize,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            create_root: false,
            hidden_names: default_hidden_names(),
            max_image_previews: default_max_image_previews(),
        }
    }
}

/// Thumbnail cache location, capacity and preview size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailSettings {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Maximum number of stored thumbnails; `0` keeps none.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_thumbnail_edge")]
    pub max_width: u32,
    #[serde(default = "default_thumbnail_edge")]
    pub max_height: u32,
    /// Maximum concurrent generations.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl ThumbnailSettings {
    /// `cache_dir` with a leading `~` expanded to `$HOME`.
    pub fn cache_dir(&self) -> PathBuf {
        expand_home(&self.cache_dir)
    }
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            capacity: default_capacity(),
            max_width: default_thumbnail_edge(),
            max_height: default_thumbnail_edge(),
            workers: default_workers(),
        }
    }
}

/// Expands a leading `~` component to `$HOME`. Other paths are returned as-is.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

fn default_root() -> PathBuf {
    home_dir()
}

fn default_cache_dir() -> PathBuf {
    home_dir().join(".rootview_cache")
}

fn default_max_image_previews() -> usize {
    50
}

fn default_capacity() -> usize {
    100
}

fn default_thumbnail_edge() -> u32 {
    150
}

fn default_workers() -> usize {
    4
}
