//! Entry classification: extension table, display appearance and the
//! hidden-name predicate.
//!
//! The extension table is plain data ([`TypeSpec`] values, usually loaded
//! from the `[[file_types]]` section of the config). [`TypeTable::new`]
//! validates it once and builds an extension index, so classification is a
//! single hash lookup.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Semantic category of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Folder,
    Image,
    Video,
    Audio,
    Archive,
    Text,
    Pdf,
    Office,
    Executable,
    /// Fallback for anything the table does not recognise.
    File,
}

impl EntryType {
    /// Every variant, in display order.
    pub const ALL: [EntryType; 10] = [
        EntryType::Folder,
        EntryType::Image,
        EntryType::Video,
        EntryType::Audio,
        EntryType::Archive,
        EntryType::Text,
        EntryType::Pdf,
        EntryType::Office,
        EntryType::Executable,
        EntryType::File,
    ];

    /// Lowercase tag, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Folder => "folder",
            EntryType::Image => "image",
            EntryType::Video => "video",
            EntryType::Audio => "audio",
            EntryType::Archive => "archive",
            EntryType::Text => "text",
            EntryType::Pdf => "pdf",
            EntryType::Office => "office",
            EntryType::Executable => "executable",
            EntryType::File => "file",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the extension table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub kind: EntryType,
    #[serde(default)]
    pub extensions: Vec<String>,
    pub icon: String,
    pub color: String,
}

/// Icon tag and color used to render an [`EntryType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appearance {
    pub icon: String,
    pub color: String,
}

/// Validated extension table with a precomputed lookup index.
#[derive(Debug, Clone)]
pub struct TypeTable {
    specs: Vec<TypeSpec>,
    index: HashMap<String, EntryType>,
    appearances: HashMap<EntryType, Appearance>,
    fallback: Appearance,
}

impl TypeTable {
    /// Builds a table from `specs`.
    ///
    /// Extensions are lowercased and stripped of a leading `.`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] when an extension is empty, appears more
    /// than once, or is attached to `folder` or `file`.
    pub fn new(specs: Vec<TypeSpec>) -> CoreResult<Self> {
        let mut index = HashMap::new();
        let mut cleaned = Vec::with_capacity(specs.len());

        for spec in specs {
            if matches!(spec.kind, EntryType::Folder | EntryType::File) && !spec.extensions.is_empty()
            {
                return Err(CoreError::Config(format!(
                    "`{}` cannot list extensions",
                    spec.kind
                )));
            }

            let mut extensions = Vec::with_capacity(spec.extensions.len());
            for raw in &spec.extensions {
                let ext = normalize_extension(raw);
                if ext.is_empty() {
                    return Err(CoreError::Config(format!(
                        "empty extension in `{}`",
                        spec.kind
                    )));
                }
                if let Some(previous) = index.insert(ext.clone(), spec.kind) {
                    return Err(CoreError::Config(format!(
                        "extension `{ext}` listed for both `{previous}` and `{}`",
                        spec.kind
                    )));
                }
                extensions.push(ext);
            }
            cleaned.push(TypeSpec { extensions, ..spec });
        }

        Ok(Self::from_parts(cleaned, index))
    }

    fn from_parts(specs: Vec<TypeSpec>, index: HashMap<String, EntryType>) -> Self {
        let appearances: HashMap<EntryType, Appearance> = specs
            .iter()
            .map(|s| {
                (
                    s.kind,
                    Appearance {
                        icon: s.icon.clone(),
                        color: s.color.clone(),
                    },
                )
            })
            .collect();
        let fallback = appearances
            .get(&EntryType::File)
            .cloned()
            .unwrap_or_else(|| Appearance {
                icon: "bi-file-earmark".to_string(),
                color: "#000000".to_string(),
            });

        Self {
            specs,
            index,
            appearances,
            fallback,
        }
    }

    /// Classifies an entry by name.
    ///
    /// Directories are always [`EntryType::Folder`]. Files are looked up by
    /// the lowercased text after the last `.`; unknown or missing extensions
    /// give [`EntryType::File`].
    pub fn classify(&self, name: &str, is_dir: bool) -> EntryType {
        if is_dir {
            return EntryType::Folder;
        }
        let ext = extension_of(name);
        if ext.is_empty() {
            return EntryType::File;
        }
        self.index.get(&ext).copied().unwrap_or(EntryType::File)
    }

    /// Icon and color for `kind`, falling back to the `file` appearance.
    pub fn appearance(&self, kind: EntryType) -> &Appearance {
        self.appearances.get(&kind).unwrap_or(&self.fallback)
    }

    /// The validated rows, in configuration order.
    pub fn specs(&self) -> &[TypeSpec] {
        &self.specs
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        let specs = default_specs();
        let index = specs
            .iter()
            .flat_map(|s| s.extensions.iter().map(move |e| (e.clone(), s.kind)))
            .collect();
        Self::from_parts(specs, index)
    }
}

/// Names hidden from listings in addition to dot-files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenNames {
    names: HashSet<String>,
}

impl HiddenNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `name` starts with `.` or is one of the configured names.
    pub fn is_hidden(&self, name: &str) -> bool {
        name.starts_with('.') || self.names.contains(name)
    }
}

impl Default for HiddenNames {
    fn default() -> Self {
        Self::new(default_hidden_names())
    }
}

/// Everything a directory listing needs to decide what to show and how.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub types: TypeTable,
    pub hidden: HiddenNames,
}

impl Catalog {
    pub fn new(types: TypeTable, hidden: HiddenNames) -> Self {
        Self { types, hidden }
    }
}

pub(crate) fn default_hidden_names() -> Vec<String> {
    ["__pycache__", "Thumbs.db", ".git", ".svn", ".DS_Store"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// The built-in extension table.
pub fn default_specs() -> Vec<TypeSpec> {
    fn spec(kind: EntryType, extensions: &[&str], icon: &str, color: &str) -> TypeSpec {
        TypeSpec {
            kind,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            icon: icon.to_string(),
            color: color.to_string(),
        }
    }

    vec![
        spec(
            EntryType::Image,
            &["gif", "ico", "jpeg", "jpg", "png", "svg", "webp", "bmp", "tiff"],
            "bi-image",
            "#4CAF50",
        ),
        spec(
            EntryType::Video,
            &["mp4", "m4v", "ogv", "webm", "mov", "avi", "mkv", "flv", "wmv"],
            "bi-film",
            "#FF5722",
        ),
        spec(
            EntryType::Audio,
            &["mp3", "wav", "ogg", "m4a", "flac", "aac", "wma"],
            "bi-music-note-beamed",
            "#9C27B0",
        ),
        spec(
            EntryType::Archive,
            &["7z", "zip", "rar", "gz", "tar", "bz2", "xz", "lzma"],
            "bi-archive-fill",
            "#795548",
        ),
        spec(
            EntryType::Text,
            &[
                "txt", "md", "py", "js", "css", "html", "json", "yaml", "yml", "c", "cpp", "java",
                "php", "rb", "go", "rs", "swift",
            ],
            "bi-file-earmark-text",
            "#2196F3",
        ),
        spec(EntryType::Pdf, &["pdf"], "bi-file-earmark-pdf", "#F44336"),
        spec(
            EntryType::Office,
            &["doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp"],
            "bi-file-earmark-richtext",
            "#FF9800",
        ),
        spec(
            EntryType::Executable,
            &["exe", "msi", "deb", "rpm", "dmg", "app"],
            "bi-gear",
            "#607D8B",
        ),
        spec(EntryType::Folder, &[], "bi-folder-fill", "#FFC107"),
        spec(EntryType::File, &[], "bi-file-earmark", "#000000"),
    ]
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}

fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}
