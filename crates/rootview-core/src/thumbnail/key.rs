//! Cache keys derived from file identity.

use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Fingerprint of a source image: SHA-256 over its path, mtime and size.
///
/// File content is never read. A rewritten file gets a new mtime or size and
/// therefore a new key, so a stale thumbnail is simply never looked up again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for `path` as last modified at `modified` with `size` bytes.
    pub fn new(path: &Path, modified: SystemTime, size: u64) -> Self {
        let since_epoch = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        let material = format!(
            "{}_{}.{:09}_{}",
            path.to_string_lossy(),
            since_epoch.as_secs(),
            since_epoch.subsec_nanos(),
            size
        );
        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Parses a key from a stored file stem, rejecting anything that is not
    /// a 64-character lowercase hex digest.
    pub fn parse(stem: &str) -> Option<Self> {
        let valid = stem.len() == 64
            && stem
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
