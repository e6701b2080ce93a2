//! Root-confined path resolution.
//!
//! Every path a front end receives from a user goes through [`resolve`] (or
//! one of its siblings) before it touches the filesystem. Resolution is a
//! two-step check: the request is normalized lexically so `..` can never climb
//! above the root, then the joined path is canonicalized and compared
//! component-wise against the canonical root so symlinks cannot leave it
//! either.

use std::path::{Component, Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::fs::ops::is_valid_filename;

/// The directory boundary of a browsing session.
///
/// Holds the canonical form of the directory, so comparisons against
/// canonicalized request paths are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    path: PathBuf,
}

impl Root {
    /// Canonicalizes `path` and checks that it is a directory.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`]: the path does not exist.
    /// - [`CoreError::NotADirectory`]: the path is a file.
    /// - [`CoreError::PermissionDenied`]: the path cannot be inspected.
    pub fn new(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let canonical = path
            .canonicalize()
            .map_err(|e| CoreError::from_io(path, e))?;
        if !canonical.is_dir() {
            return Err(CoreError::NotADirectory(canonical));
        }
        Ok(Self { path: canonical })
    }

    /// Returns the canonical root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if `path` is the root or lies beneath it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

/// An absolute path proven to lie inside a [`Root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    relative: PathBuf,
}

impl ResolvedPath {
    /// The absolute path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path relative to the root (empty for the root itself).
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Returns `true` if this is the root directory.
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }

    /// The relative path rendered with `/` separators, suitable for links.
    pub fn relative_display(&self) -> String {
        self.breadcrumbs().join("/")
    }

    /// The components of the relative path, outermost first.
    pub fn breadcrumbs(&self) -> Vec<String> {
        self.relative
            .components()
            .map(|c| crate::nfc_string(&c.as_os_str().to_string_lossy()))
            .collect()
    }

    /// Consumes `self`, returning the absolute path.
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Resolves a caller-supplied relative path against `root`.
///
/// Backslashes are treated as separators and a leading `/` is ignored, so an
/// absolute-looking request still addresses the root. The result is
/// canonical: symlinks along the way are followed and must stay inside the
/// root. An empty request resolves to the root itself.
///
/// # Errors
///
/// - [`CoreError::Containment`]: the request climbs above the root, or a
///   symlink leads outside it.
/// - [`CoreError::NotFound`]: the target does not exist.
/// - [`CoreError::PermissionDenied`]: a component cannot be traversed.
pub fn resolve(root: &Root, relative: &str) -> CoreResult<ResolvedPath> {
    let normalized = normalize(relative)?;
    let joined = root.path().join(&normalized);
    let canonical = joined
        .canonicalize()
        .map_err(|e| CoreError::from_io(&joined, e))?;
    confine(root, canonical, relative)
}

/// Resolves a directory plus a not-yet-existing child `name`.
///
/// The parent is resolved with [`resolve`] and must be a directory; the
/// child is joined without following it, so it can name something about to
/// be written. When the child already exists as a symlink its target must
/// also stay inside the root, since a write would go through the link.
///
/// # Errors
///
/// As [`resolve`], plus [`CoreError::InvalidName`] for a bad `name` and
/// [`CoreError::NotADirectory`] when the parent is a file.
pub fn resolve_child(root: &Root, parent: &str, name: &str) -> CoreResult<ResolvedPath> {
    let child = join_child(root, parent, name)?;
    if let Ok(meta) = std::fs::symlink_metadata(child.path()) {
        if meta.file_type().is_symlink() {
            let target = child
                .path()
                .canonicalize()
                .map_err(|_| CoreError::Containment(format!("dangling link: {name}")))?;
            if !root.contains(&target) {
                return Err(CoreError::Containment(name.to_string()));
            }
        }
    }
    Ok(child)
}

/// Resolves an existing entry without following a symlink in its last
/// component.
///
/// Rename and delete act on the entry itself, not on what a link points to,
/// so only the entry's parent has to be inside the root. A link to somewhere
/// outside, or a dangling one, is still addressable. The root cannot be
/// addressed this way.
///
/// # Errors
///
/// As [`resolve`], plus [`CoreError::InvalidName`] for a bad last
/// component, [`CoreError::Containment`] for an empty request and
/// [`CoreError::NotFound`] if the entry is missing.
pub fn resolve_entry(root: &Root, relative: &str) -> CoreResult<ResolvedPath> {
    let normalized = normalize(relative)?;
    let name = normalized
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CoreError::Containment("the root itself cannot be modified".to_string()))?;
    let parent = normalized
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let resolved = join_child(root, &parent, &name)?;
    if std::fs::symlink_metadata(resolved.path()).is_err() {
        return Err(CoreError::NotFound(resolved.into_path_buf()));
    }
    Ok(resolved)
}

/// Joins `name` onto a resolved directory without looking at the child.
fn join_child(root: &Root, parent: &str, name: &str) -> CoreResult<ResolvedPath> {
    if !is_valid_filename(name) {
        return Err(CoreError::InvalidName(name.to_string()));
    }
    let parent = resolve(root, parent)?;
    if !parent.path().is_dir() {
        return Err(CoreError::NotADirectory(parent.into_path_buf()));
    }
    Ok(ResolvedPath {
        relative: parent.relative.join(name),
        path: parent.path().join(name),
    })
}

/// Lexically normalizes a request into a relative path with no `.` or `..`.
fn normalize(relative: &str) -> CoreResult<PathBuf> {
    let unified = relative.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(CoreError::Containment(relative.to_string()));
                }
            }
            other => {
                if other.contains('\0') {
                    return Err(CoreError::InvalidName(other.to_string()));
                }
                // Drive prefixes and similar platform components never name a child.
                let mut components = Path::new(other).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => parts.push(other),
                    _ => return Err(CoreError::Containment(relative.to_string())),
                }
            }
        }
    }

    Ok(parts.iter().collect())
}

fn confine(root: &Root, canonical: PathBuf, request: &str) -> CoreResult<ResolvedPath> {
    let relative = match canonical.strip_prefix(root.path()) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            tracing::warn!(request, "rejected path outside root");
            return Err(CoreError::Containment(request.to_string()));
        }
    };
    Ok(ResolvedPath {
        path: canonical,
        relative,
    })
}
