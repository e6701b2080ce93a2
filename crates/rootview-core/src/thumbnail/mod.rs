//! Persistent, bounded thumbnail cache.
//!
//! [`ThumbnailCache::get_or_create`] fingerprints a source image
//! ([`CacheKey`]), serves a stored preview when one exists, and otherwise
//! generates one on a blocking worker. Concurrent requests for the same key
//! share a single generation. Failures are returned to every waiter and are
//! never stored, so the next request tries again.

pub mod generator;
pub mod key;
pub mod store;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Semaphore;

use crate::config::ThumbnailSettings;
use crate::error::{CoreResult, ThumbnailError};

pub use generator::{ImageThumbnailer, ThumbnailGenerator};
pub use key::CacheKey;
pub use store::{StoredThumbnail, ThumbnailStore};

type Flight = Shared<BoxFuture<'static, Result<Thumbnail, ThumbnailError>>>;

/// An encoded preview image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    key: CacheKey,
    data: Arc<[u8]>,
    generated_at: SystemTime,
}

impl Thumbnail {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// PNG-encoded bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn generated_at(&self) -> SystemTime {
        self.generated_at
    }

    pub fn content_type(&self) -> &'static str {
        "image/png"
    }
}

/// Shared handle to the thumbnail cache. Cloning is cheap.
#[derive(Clone)]
pub struct ThumbnailCache {
    inner: Arc<Inner>,
}

struct Inner {
    store: Mutex<ThumbnailStore>,
    in_flight: Mutex<HashMap<CacheKey, Flight>>,
    generator: Arc<dyn ThumbnailGenerator>,
    workers: Semaphore,
    max_width: u32,
    max_height: u32,
}

impl std::fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailCache")
            .field("store", &self.inner.lock_store().dir().to_path_buf())
            .field("max_width", &self.inner.max_width)
            .field("max_height", &self.inner.max_height)
            .finish_non_exhaustive()
    }
}

impl ThumbnailCache {
    /// Opens the cache described by `settings` using [`ImageThumbnailer`].
    ///
    /// # Errors
    ///
    /// Fails if the cache directory cannot be created or scanned.
    pub fn open(settings: &ThumbnailSettings) -> CoreResult<Self> {
        Self::with_generator(settings, Arc::new(ImageThumbnailer))
    }

    /// Opens the cache with a custom generator.
    pub fn with_generator(
        settings: &ThumbnailSettings,
        generator: Arc<dyn ThumbnailGenerator>,
    ) -> CoreResult<Self> {
        let store = ThumbnailStore::open(&settings.cache_dir(), settings.capacity)?;
        Ok(Self {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                in_flight: Mutex::new(HashMap::new()),
                generator,
                workers: Semaphore::new(settings.workers.max(1)),
                max_width: settings.max_width,
                max_height: settings.max_height,
            }),
        })
    }

    /// Returns the thumbnail for `source`, generating it at most once per key.
    ///
    /// `source` should be an already-resolved absolute path.
    ///
    /// # Errors
    ///
    /// - [`ThumbnailError::SourceMissing`] if `source` does not exist.
    /// - [`ThumbnailError::Decode`] if it is not a regular file or not a
    ///   decodable image.
    /// - [`ThumbnailError::Store`] / [`ThumbnailError::Worker`] on
    ///   infrastructure failure.
    pub async fn get_or_create(&self, source: &Path) -> Result<Thumbnail, ThumbnailError> {
        let meta = tokio::fs::metadata(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ThumbnailError::SourceMissing(source.to_path_buf())
            } else {
                ThumbnailError::Decode(format!("{}: {e}", source.display()))
            }
        })?;
        if !meta.is_file() {
            return Err(ThumbnailError::Decode(format!(
                "{}: not a regular file",
                source.display()
            )));
        }

        let modified = meta.modified().unwrap_or(UNIX_EPOCH);
        let key = CacheKey::new(source, modified, meta.len());

        if let Some(hit) = self.inner.read_stored(&key).await {
            tracing::trace!(%key, "thumbnail cache hit");
            return Ok(hit);
        }
        self.flight(source, key).await
    }

    /// Number of stored thumbnails.
    pub fn len(&self) -> usize {
        self.inner.lock_store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock_store().capacity()
    }

    /// Deletes every stored thumbnail.
    pub fn clear(&self) -> Result<usize, ThumbnailError> {
        self.inner.lock_store().clear()
    }

    /// Joins the running generation for `key`, or starts one.
    fn flight(&self, source: &Path, key: CacheKey) -> Flight {
        let mut in_flight = self.inner.lock_in_flight();
        if let Some(running) = in_flight.get(&key) {
            tracing::trace!(%key, "joining in-flight thumbnail");
            return running.clone();
        }

        // The task's guard removes the entry; it cannot run before the insert
        // below because it needs the lock we are holding.
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let source = source.to_path_buf();
        let handle = tokio::spawn(async move { inner.run(source, task_key).await });

        let flight = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(ThumbnailError::Worker(e.to_string())),
            }
        }
        .boxed()
        .shared();
        in_flight.insert(key, flight.clone());
        flight
    }
}

impl Inner {
    fn lock_store(&self) -> MutexGuard<'_, ThumbnailStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, Flight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads a stored thumbnail. A file removed behind the store's back is
    /// forgotten and reported as a miss.
    async fn read_stored(&self, key: &CacheKey) -> Option<Thumbnail> {
        let (path, record) = {
            let store = self.lock_store();
            let record = store.lookup(key)?;
            (store.path_for(key), record)
        };

        match tokio::fs::read(&path).await {
            Ok(data) => Some(Thumbnail {
                key: key.clone(),
                data: Arc::from(data),
                generated_at: record.generated_at,
            }),
            Err(e) => {
                tracing::debug!(%key, "stored thumbnail unreadable, regenerating: {e}");
                let mut store = self.lock_store();
                if store.lookup(key) == Some(record) {
                    store.forget(key);
                }
                None
            }
        }
    }

    async fn run(self: Arc<Self>, source: PathBuf, key: CacheKey) -> Result<Thumbnail, ThumbnailError> {
        let _guard = FlightGuard {
            inner: Arc::clone(&self),
            key: key.clone(),
        };

        // A flight that finished just before this one started may have
        // stored the key already.
        if let Some(hit) = self.read_stored(&key).await {
            return Ok(hit);
        }

        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|e| ThumbnailError::Worker(e.to_string()))?;

        let inner = Arc::clone(&self);
        let result = tokio::task::spawn_blocking(move || inner.generate(&source, &key))
            .await
            .map_err(|e| ThumbnailError::Worker(e.to_string()))?;

        if let Err(e) = &result {
            tracing::warn!("thumbnail generation failed: {e}");
        }
        result
    }

    fn generate(&self, source: &Path, key: &CacheKey) -> Result<Thumbnail, ThumbnailError> {
        let started = Instant::now();
        let data = self
            .generator
            .generate(source, self.max_width, self.max_height)
            .map_err(|e| {
                if source.exists() {
                    e
                } else {
                    ThumbnailError::SourceMissing(source.to_path_buf())
                }
            })?;

        let (record, evicted) = self.lock_store().insert(key, &data)?;
        tracing::debug!(
            %key,
            source = %source.display(),
            bytes = data.len(),
            evicted = evicted.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generated thumbnail"
        );

        Ok(Thumbnail {
            key: key.clone(),
            data: Arc::from(data),
            generated_at: record.generated_at,
        })
    }
}

/// Clears the in-flight entry when a generation finishes, fails or panics.
struct FlightGuard {
    inner: Arc<Inner>,
    key: CacheKey,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.lock_in_flight().remove(&self.key);
    }
}
