//! File operations: copy-in, upload, create folder, rename, delete and
//! entry details.
//!
//! Every function here expects paths that were already confined to the
//! browsing root (see [`crate::fs::resolve`]); none of them re-check
//! containment.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::catalog::{EntryType, TypeTable};
use crate::error::{CoreError, CoreResult};

/// Maximum recursion depth for copy_dir_recursive to prevent symlink loops.
const MAX_COPY_DEPTH: usize = 64;

/// Detailed metadata for a single entry (the "properties" view).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDetails {
    pub name: String,
    pub path: PathBuf,
    pub entry_type: EntryType,
    pub is_dir: bool,
    pub is_symlink: bool,
    /// Size in bytes; `0` for directories.
    pub size: u64,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    /// `ls -l` style mode string, e.g. `-rw-r--r--`.
    pub permissions: String,
    pub readonly: bool,
}

/// Copies an external file or directory into `dir`, keeping its name.
///
/// Returns the path of the new entry.
///
/// # Errors
///
/// - [`CoreError::NotFound`] if `src` does not exist.
/// - [`CoreError::NotADirectory`] if `dir` is not a directory.
/// - [`CoreError::AlreadyExists`] if the target exists and `overwrite` is `false`.
/// - [`CoreError::Io`] for any I/O failure during copy.
pub fn copy_into(dir: &Path, src: &Path, overwrite: bool) -> CoreResult<PathBuf> {
    let meta = std::fs::symlink_metadata(src).map_err(|e| CoreError::from_io(src, e))?;
    if !dir.is_dir() {
        return Err(CoreError::NotADirectory(dir.to_path_buf()));
    }
    let name = src
        .file_name()
        .ok_or_else(|| CoreError::InvalidName(src.display().to_string()))?;
    let dest = dir.join(name);

    if std::fs::symlink_metadata(&dest).is_ok() {
        if !overwrite {
            return Err(CoreError::AlreadyExists(dest));
        }
        delete_entry(&dest)?;
    }

    if meta.is_dir() {
        copy_dir_recursive(src, &dest, 0)?;
    } else {
        // Copy-in always materializes the target; links are not carried across.
        std::fs::copy(src, &dest)?;
    }

    tracing::info!(src = %src.display(), dest = %dest.display(), "copied into root");
    Ok(dest)
}

fn copy_dir_recursive(src: &Path, dest: &Path, depth: usize) -> CoreResult<()> {
    if depth > MAX_COPY_DEPTH {
        return Err(CoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("maximum recursion depth ({MAX_COPY_DEPTH}) exceeded during copy"),
        )));
    }

    std::fs::create_dir_all(dest)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let entry_path = entry.path();
        let target = dest.join(entry.file_name());

        // Use entry.file_type() which does NOT follow symlinks
        let ft = entry.file_type()?;

        if ft.is_dir() {
            copy_dir_recursive(&entry_path, &target, depth + 1)?;
        } else if ft.is_symlink() {
            // Only links to regular files are materialized; anything else is skipped.
            if entry_path.is_file() {
                std::fs::copy(&entry_path, &target)?;
            }
        } else {
            std::fs::copy(&entry_path, &target)?;
        }
    }

    Ok(())
}

/// Writes uploaded bytes into `dir` under a sanitized version of `file_name`.
///
/// An existing file of the same name is replaced. Returns the written path.
///
/// # Errors
///
/// - [`CoreError::InvalidName`] if nothing usable is left after sanitizing.
/// - [`CoreError::NotADirectory`] if `dir` is not a directory.
/// - [`CoreError::Io`] if the write fails.
pub fn save_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> CoreResult<PathBuf> {
    let name = sanitize_file_name(file_name)?;
    if !dir.is_dir() {
        return Err(CoreError::NotADirectory(dir.to_path_buf()));
    }
    let dest = dir.join(&name);
    if dest.is_dir() {
        return Err(CoreError::AlreadyExists(dest));
    }
    std::fs::write(&dest, bytes).map_err(|e| CoreError::from_io(&dest, e))?;

    tracing::info!(dest = %dest.display(), bytes = bytes.len(), "saved upload");
    Ok(dest)
}

/// Reduces a client-supplied file name to a safe single component.
///
/// Only the last path component is kept. Whitespace runs become `_`, and
/// anything other than letters, digits, `.`, `-` and `_` is dropped. Leading
/// and trailing dots and underscores are stripped, so the result is never
/// hidden and never `.`/`..`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidName`] if the result would be empty.
pub fn sanitize_file_name(name: &str) -> CoreResult<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let composed = crate::nfc_string(base);
    let joined = composed.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return Err(CoreError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Creates a new, empty directory at `path`.
///
/// # Errors
///
/// - [`CoreError::AlreadyExists`] if anything already exists at `path`.
/// - [`CoreError::NotFound`] if the parent does not exist.
/// - [`CoreError::Io`] for other failures.
pub fn create_folder(path: &Path) -> CoreResult<()> {
    std::fs::create_dir(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::AlreadyExists => CoreError::AlreadyExists(path.to_path_buf()),
        _ => CoreError::from_io(path, e),
    })?;
    tracing::info!(path = %path.display(), "created folder");
    Ok(())
}

/// Renames a file or directory within the same parent directory.
///
/// The `new_name` must be a valid file name (no path separators, not empty,
/// not `.` or `..`). Returns the new path.
///
/// # Errors
///
/// - [`CoreError::NotFound`] if `path` does not exist.
/// - [`CoreError::InvalidName`] if `new_name` is invalid.
/// - [`CoreError::AlreadyExists`] if an entry named `new_name` exists.
/// - [`CoreError::Io`] for any I/O failure.
pub fn rename_entry(path: &Path, new_name: &str) -> CoreResult<PathBuf> {
    // Use symlink_metadata to avoid TOCTOU and handle symlinks correctly
    if std::fs::symlink_metadata(path).is_err() {
        return Err(CoreError::NotFound(path.to_path_buf()));
    }

    if !is_valid_filename(new_name) {
        return Err(CoreError::InvalidName(new_name.to_string()));
    }

    let parent = path
        .parent()
        .ok_or_else(|| CoreError::InvalidName("no parent directory".to_string()))?;
    let new_path = parent.join(new_name);

    if new_path == path {
        return Ok(new_path);
    }
    if std::fs::symlink_metadata(&new_path).is_ok() {
        return Err(CoreError::AlreadyExists(new_path));
    }

    std::fs::rename(path, &new_path)?;

    tracing::info!(from = %path.display(), to = %new_path.display(), "renamed entry");
    Ok(new_path)
}

/// Deletes a file or directory (recursively).
///
/// Symlinks are removed themselves; their targets are left alone.
///
/// # Errors
///
/// - [`CoreError::NotFound`] if `path` does not exist.
/// - [`CoreError::Io`] for any I/O failure during deletion.
pub fn delete_entry(path: &Path) -> CoreResult<()> {
    // Use symlink_metadata: does NOT follow symlinks, avoids TOCTOU
    let meta = std::fs::symlink_metadata(path).map_err(|e| CoreError::from_io(path, e))?;

    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        // Handles both regular files and symlinks
        std::fs::remove_file(path)?;
    }

    tracing::info!(path = %path.display(), "deleted entry");
    Ok(())
}

/// Collects detailed metadata for `path`, following a final symlink.
///
/// # Errors
///
/// - [`CoreError::NotFound`] if `path` (or a link's target) does not exist.
/// - [`CoreError::PermissionDenied`] if it cannot be stat'ed.
pub fn entry_details(path: &Path, types: &TypeTable) -> CoreResult<EntryDetails> {
    let link_meta = std::fs::symlink_metadata(path).map_err(|e| CoreError::from_io(path, e))?;
    let meta = std::fs::metadata(path).map_err(|e| CoreError::from_io(path, e))?;
    let name = path
        .file_name()
        .map(|n| crate::nfc_string(&n.to_string_lossy()))
        .unwrap_or_default();
    let is_dir = meta.is_dir();

    Ok(EntryDetails {
        entry_type: types.classify(&name, is_dir),
        name,
        path: path.to_path_buf(),
        is_dir,
        is_symlink: link_meta.file_type().is_symlink(),
        size: if is_dir { 0 } else { meta.len() },
        created: meta.created().ok(),
        modified: meta.modified().ok(),
        accessed: meta.accessed().ok(),
        permissions: permission_string(&meta),
        readonly: meta.permissions().readonly(),
    })
}

#[cfg(unix)]
fn permission_string(meta: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    let mut out = String::with_capacity(10);
    out.push(if meta.is_dir() { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn permission_string(meta: &std::fs::Metadata) -> String {
    let kind = if meta.is_dir() { 'd' } else { '-' };
    let write = if meta.permissions().readonly() { '-' } else { 'w' };
    format!("{kind}r{write}-")
}

pub(crate) fn is_valid_filename(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if name.contains('/') || name.contains('\0') {
        return false;
    }
    #[cfg(windows)]
    if name.contains('\\') || name.contains(':') {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn copy_into_regular_file() {
        let src_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let src = src_dir.path().join("report.pdf");
        fs::write(&src, "pdf bytes").unwrap();

        let dest = copy_into(root.path(), &src, false).unwrap();

        assert_eq!(dest, root.path().join("report.pdf"));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "pdf bytes");
        assert!(src.exists());
    }

    #[test]
    fn copy_into_refuses_overwrite() {
        let src_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let src = src_dir.path().join("a.txt");
        fs::write(&src, "new").unwrap();
        fs::write(root.path().join("a.txt"), "old").unwrap();

        let err = copy_into(root.path(), &src, false).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(root.path().join("a.txt")).unwrap(), "old");

        copy_into(root.path(), &src, true).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn copy_into_directory_recursive() {
        let src_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let src = src_dir.path().join("album");
        fs::create_dir_all(src.join("2024")).unwrap();
        fs::write(src.join("2024/beach.png"), "png").unwrap();

        let dest = copy_into(root.path(), &src, false).unwrap();

        assert!(dest.join("2024/beach.png").is_file());
    }

    #[test]
    fn copy_into_missing_source() {
        let root = TempDir::new().unwrap();
        let err = copy_into(root.path(), &root.path().join("ghost"), false).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn save_upload_writes_sanitized_name() {
        let root = TempDir::new().unwrap();

        let dest = save_upload(root.path(), "My Holiday Photo.JPG", b"jpeg").unwrap();

        assert_eq!(dest, root.path().join("My_Holiday_Photo.JPG"));
        assert_eq!(fs::read(&dest).unwrap(), b"jpeg");
    }

    #[test]
    fn save_upload_replaces_existing_file() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("notes.txt"), "old").unwrap();

        save_upload(root.path(), "notes.txt", b"new").unwrap();

        assert_eq!(fs::read_to_string(root.path().join("notes.txt")).unwrap(), "new");
    }

    #[test]
    fn save_upload_rejects_empty_name() {
        let root = TempDir::new().unwrap();
        let err = save_upload(root.path(), "../..", b"x").unwrap_err();
        assert!(matches!(err, CoreError::InvalidName(_)));
    }

    #[test]
    fn sanitize_strips_paths_and_specials() {
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\cv.docx").unwrap(), "cv.docx");
        assert_eq!(sanitize_file_name(".bashrc").unwrap(), "bashrc");
        assert_eq!(sanitize_file_name("a  b\tc.txt").unwrap(), "a_b_c.txt");
        assert_eq!(sanitize_file_name("rm -rf $HOME;.sh").unwrap(), "rm_-rf_HOME.sh");
        assert_eq!(sanitize_file_name("照片 01.png").unwrap(), "照片_01.png");
    }

    #[test]
    fn sanitize_rejects_nothing_left() {
        for name in ["", "...", "///", "$$$", " _ "] {
            assert!(
                matches!(sanitize_file_name(name), Err(CoreError::InvalidName(_))),
                "name {name:?}"
            );
        }
    }

    #[test]
    fn create_folder_new() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("new");

        create_folder(&path).unwrap();

        assert!(path.is_dir());
    }

    #[test]
    fn create_folder_existing_is_conflict() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("taken")).unwrap();

        let err = create_folder(&root.path().join("taken")).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));
    }

    #[test]
    fn create_folder_missing_parent() {
        let root = TempDir::new().unwrap();
        let err = create_folder(&root.path().join("a/b")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn rename_entry_regular() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("old.txt");
        fs::write(&path, "content").unwrap();

        let new_path = rename_entry(&path, "new.txt").unwrap();

        assert!(!path.exists());
        assert_eq!(new_path, root.path().join("new.txt"));
        assert_eq!(fs::read_to_string(&new_path).unwrap(), "content");
    }

    #[test]
    fn rename_entry_directory() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("dir_old");
        fs::create_dir(&path).unwrap();

        rename_entry(&path, "dir_new").unwrap();

        assert!(root.path().join("dir_new").is_dir());
    }

    #[test]
    fn rename_entry_to_existing_is_conflict() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.txt"), "a").unwrap();
        fs::write(root.path().join("b.txt"), "b").unwrap();

        let err = rename_entry(&root.path().join("a.txt"), "b.txt").unwrap_err();

        assert!(matches!(err, CoreError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(root.path().join("b.txt")).unwrap(), "b");
    }

    #[test]
    fn rename_entry_same_name_is_noop() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("same.txt");
        fs::write(&path, "s").unwrap();

        assert_eq!(rename_entry(&path, "same.txt").unwrap(), path);
    }

    #[test]
    fn rename_entry_nonexistent_returns_not_found() {
        let root = TempDir::new().unwrap();
        let err = rename_entry(&root.path().join("nope"), "x").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn rename_entry_invalid_names() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("file.txt");
        fs::write(&path, "").unwrap();

        for name in ["", ".", "..", "a/b", "bad\0name"] {
            let err = rename_entry(&path, name).unwrap_err();
            assert!(matches!(err, CoreError::InvalidName(_)), "name {name:?}");
        }
        assert!(path.exists());
    }

    #[test]
    fn delete_entry_regular() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("doomed.txt");
        fs::write(&path, "bye").unwrap();

        delete_entry(&path).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn delete_entry_directory_recursive() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("tree");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("sub/leaf.txt"), "leaf").unwrap();

        delete_entry(&dir).unwrap();

        assert!(!dir.exists());
    }

    #[test]
    fn delete_entry_nonexistent_returns_not_found() {
        let root = TempDir::new().unwrap();
        let err = delete_entry(&root.path().join("ghost")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn delete_entry_symlink_keeps_target() {
        let root = TempDir::new().unwrap();
        let target = root.path().join("target.txt");
        fs::write(&target, "keep").unwrap();
        let link = root.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        delete_entry(&link).unwrap();

        assert!(!link.exists());
        assert!(target.exists());
    }

    #[test]
    fn entry_details_file() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("song.mp3");
        fs::write(&path, vec![0u8; 42]).unwrap();

        let details = entry_details(&path, &TypeTable::default()).unwrap();

        assert_eq!(details.name, "song.mp3");
        assert_eq!(details.entry_type, EntryType::Audio);
        assert_eq!(details.size, 42);
        assert!(!details.is_dir);
        assert!(details.modified.is_some());
        assert_eq!(details.permissions.len(), if cfg!(unix) { 10 } else { 4 });
        assert!(details.permissions.starts_with('-'));
    }

    #[test]
    fn entry_details_directory() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("folder");
        fs::create_dir(&path).unwrap();

        let details = entry_details(&path, &TypeTable::default()).unwrap();

        assert!(details.is_dir);
        assert_eq!(details.size, 0);
        assert_eq!(details.entry_type, EntryType::Folder);
        assert!(details.permissions.starts_with('d'));
    }

    #[cfg(unix)]
    #[test]
    fn permission_string_matches_mode() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let path = root.path().join("script.sh");
        fs::write(&path, "#!/bin/sh").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o754)).unwrap();

        let details = entry_details(&path, &TypeTable::default()).unwrap();

        assert_eq!(details.permissions, "-rwxr-xr--");
    }

    #[test]
    fn entry_details_missing() {
        let root = TempDir::new().unwrap();
        let err = entry_details(&root.path().join("nope"), &TypeTable::default()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
