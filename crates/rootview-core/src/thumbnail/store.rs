//! On-disk thumbnail store with count-bounded eviction.
//!
//! Thumbnails live as `<dir>/<key>.png`. An in-memory index remembers when
//! each one was generated; once the index grows past capacity the oldest
//! generations are deleted first. Reading a thumbnail does not refresh it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{CoreError, CoreResult, ThumbnailError};
use crate::thumbnail::key::CacheKey;

const EXTENSION: &str = "png";

/// Index record for one stored thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredThumbnail {
    pub generated_at: SystemTime,
    /// Monotonic generation order; ties in `generated_at` are broken by it.
    seq: u64,
}

/// The persistent key → thumbnail store.
///
/// Not synchronized on its own; [`super::ThumbnailCache`] keeps it behind a
/// mutex so insert and evict are mutually exclusive.
#[derive(Debug)]
pub struct ThumbnailStore {
    dir: PathBuf,
    capacity: usize,
    entries: HashMap<CacheKey, StoredThumbnail>,
    next_seq: u64,
}

impl ThumbnailStore {
    /// Opens (creating if needed) the store at `dir`.
    ///
    /// Existing `<key>.png` files are adopted, ordered by file mtime, and the
    /// store is trimmed to `capacity`. Other files in the directory are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PermissionDenied`] or [`CoreError::Io`] if the
    /// directory cannot be created or read.
    pub fn open(dir: &Path, capacity: usize) -> CoreResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| CoreError::from_io(dir, e))?;

        let mut found: Vec<(CacheKey, SystemTime)> = Vec::new();
        for dir_entry in std::fs::read_dir(dir).map_err(|e| CoreError::from_io(dir, e))? {
            let Ok(dir_entry) = dir_entry else { continue };
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(CacheKey::parse)
            else {
                continue;
            };
            let generated_at = dir_entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((key, generated_at));
        }
        found.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut store = Self {
            dir: dir.to_path_buf(),
            capacity,
            entries: HashMap::with_capacity(found.len()),
            next_seq: 0,
        };
        for (key, generated_at) in found {
            let seq = store.bump_seq();
            store.entries.insert(key, StoredThumbnail { generated_at, seq });
        }

        let evicted = store.evict();
        tracing::info!(
            dir = %dir.display(),
            adopted = store.entries.len(),
            evicted = evicted.len(),
            "opened thumbnail store"
        );
        Ok(store)
    }

    /// File path for `key`, whether or not it is stored.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{EXTENSION}"))
    }

    /// Index record for `key`, if stored.
    pub fn lookup(&self, key: &CacheKey) -> Option<StoredThumbnail> {
        self.entries.get(key).copied()
    }

    /// Drops `key` from the index without touching the disk.
    ///
    /// Used when a stored file turns out to have been removed externally.
    pub fn forget(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Writes `data` for `key`, replacing any previous entry, then evicts.
    ///
    /// Returns the index record and the keys that were evicted.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::Store`] if the file cannot be written.
    pub fn insert(
        &mut self,
        key: &CacheKey,
        data: &[u8],
    ) -> Result<(StoredThumbnail, Vec<CacheKey>), ThumbnailError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, data)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&tmp);
                ThumbnailError::Store(format!("{}: {e}", path.display()))
            })?;

        let record = StoredThumbnail {
            generated_at: SystemTime::now(),
            seq: self.bump_seq(),
        };
        self.entries.insert(key.clone(), record);
        let evicted = self.evict();
        Ok((record, evicted))
    }

    /// Removes every stored thumbnail. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::Store`] for the first file that could not
    /// be deleted; entries removed before it stay removed.
    pub fn clear(&mut self) -> Result<usize, ThumbnailError> {
        let keys: Vec<CacheKey> = self.entries.keys().cloned().collect();
        let mut removed = 0;
        for key in keys {
            self.remove_file(&key)?;
            self.entries.remove(&key);
            removed += 1;
        }
        tracing::info!(dir = %self.dir.display(), removed, "cleared thumbnail store");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deletes oldest generations until the store is within capacity.
    fn evict(&mut self) -> Vec<CacheKey> {
        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess == 0 {
            return Vec::new();
        }

        let mut by_age: Vec<(u64, CacheKey)> = self
            .entries
            .iter()
            .map(|(key, record)| (record.seq, key.clone()))
            .collect();
        by_age.sort_unstable();

        let mut evicted = Vec::with_capacity(excess);
        for (_, key) in by_age.into_iter().take(excess) {
            if let Err(e) = self.remove_file(&key) {
                tracing::warn!(%key, "failed to delete evicted thumbnail: {e}");
            }
            self.entries.remove(&key);
            evicted.push(key);
        }
        tracing::debug!(count = evicted.len(), "evicted thumbnails");
        evicted
    }

    fn remove_file(&self, key: &CacheKey) -> Result<(), ThumbnailError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ThumbnailError::Store(format!("{}: {e}", path.display()))),
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn key(n: u64) -> CacheKey {
        CacheKey::new(Path::new("/img.png"), UNIX_EPOCH + Duration::from_secs(n), n)
    }

    #[test]
    fn open_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cache/thumbs");

        let store = ThumbnailStore::open(&dir, 10).unwrap();

        assert!(dir.is_dir());
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 10);
    }

    #[test]
    fn insert_writes_file() {
        let tmp = TempDir::new().unwrap();
        let mut store = ThumbnailStore::open(tmp.path(), 10).unwrap();

        let (record, evicted) = store.insert(&key(1), b"png-bytes").unwrap();

        assert!(evicted.is_empty());
        assert_eq!(store.lookup(&key(1)), Some(record));
        assert_eq!(fs::read(store.path_for(&key(1))).unwrap(), b"png-bytes");
    }

    #[test]
    fn reinserting_a_key_keeps_one_entry() {
        let tmp = TempDir::new().unwrap();
        let mut store = ThumbnailStore::open(tmp.path(), 10).unwrap();

        store.insert(&key(1), b"a").unwrap();
        store.insert(&key(1), b"b").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(fs::read(store.path_for(&key(1))).unwrap(), b"b");
    }

    #[test]
    fn evicts_oldest_generation_first() {
        let tmp = TempDir::new().unwrap();
        let mut store = ThumbnailStore::open(tmp.path(), 3).unwrap();

        for n in 1..=5 {
            store.insert(&key(n), b"x").unwrap();
        }

        assert_eq!(store.len(), 3);
        assert!(!store.contains(&key(1)));
        assert!(!store.contains(&key(2)));
        for n in 3..=5 {
            assert!(store.contains(&key(n)), "key {n} should be retained");
        }
        assert!(!store.path_for(&key(1)).exists());
        assert!(!store.path_for(&key(2)).exists());
    }

    #[test]
    fn regenerating_refreshes_position() {
        let tmp = TempDir::new().unwrap();
        let mut store = ThumbnailStore::open(tmp.path(), 2).unwrap();

        store.insert(&key(1), b"x").unwrap();
        store.insert(&key(2), b"x").unwrap();
        store.insert(&key(1), b"y").unwrap();
        let (_, evicted) = store.insert(&key(3), b"x").unwrap();

        assert_eq!(evicted, vec![key(2)]);
        assert!(store.contains(&key(1)));
    }

    #[test]
    fn lookup_does_not_refresh_position() {
        let tmp = TempDir::new().unwrap();
        let mut store = ThumbnailStore::open(tmp.path(), 2).unwrap();

        store.insert(&key(1), b"x").unwrap();
        store.insert(&key(2), b"x").unwrap();
        assert!(store.lookup(&key(1)).is_some());
        let (_, evicted) = store.insert(&key(3), b"x").unwrap();

        assert_eq!(evicted, vec![key(1)]);
    }

    #[test]
    fn reopen_adopts_existing_files() {
        let tmp = TempDir::new().unwrap();
        {
            let mut store = ThumbnailStore::open(tmp.path(), 10).unwrap();
            store.insert(&key(1), b"one").unwrap();
            store.insert(&key(2), b"two").unwrap();
        }
        fs::write(tmp.path().join("README.txt"), "not a thumbnail").unwrap();
        fs::write(tmp.path().join("garbage.png"), "bad stem").unwrap();

        let store = ThumbnailStore::open(tmp.path(), 10).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.contains(&key(1)));
        assert!(store.contains(&key(2)));
        assert!(tmp.path().join("README.txt").exists());
    }

    #[test]
    fn reopen_trims_to_capacity() {
        let tmp = TempDir::new().unwrap();
        {
            let mut store = ThumbnailStore::open(tmp.path(), 10).unwrap();
            for n in 1..=4 {
                store.insert(&key(n), b"x").unwrap();
            }
        }

        let store = ThumbnailStore::open(tmp.path(), 2).unwrap();

        assert_eq!(store.len(), 2);
        let on_disk = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(on_disk, 2);
    }

    #[test]
    fn clear_removes_everything() {
        let tmp = TempDir::new().unwrap();
        let mut store = ThumbnailStore::open(tmp.path(), 10).unwrap();
        store.insert(&key(1), b"x").unwrap();
        store.insert(&key(2), b"x").unwrap();

        assert_eq!(store.clear().unwrap(), 2);

        assert!(store.is_empty());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn forget_drops_index_only() {
        let tmp = TempDir::new().unwrap();
        let mut store = ThumbnailStore::open(tmp.path(), 10).unwrap();
        store.insert(&key(1), b"x").unwrap();

        store.forget(&key(1));

        assert!(!store.contains(&key(1)));
        assert!(store.path_for(&key(1)).exists());
    }
}
