use std::net::SocketAddr;
use std::path::PathBuf;

use rootview_core::Config;
use serde::Deserialize;

/// Server settings plus the embedded engine configuration.
///
/// The engine tables (`[browse]`, `[thumbnails]`, `[[file_types]]`) live in
/// the same TOML file as the server keys.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_max_upload_size_mb")]
    pub max_upload_size_mb: usize,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(flatten)]
    pub engine: Config,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl TlsConfig {
    pub fn enabled(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_upload_size_mb: default_max_upload_size_mb(),
            tls: TlsConfig::default(),
            engine: Config::default(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9090))
}

fn default_max_upload_size_mb() -> usize {
    100
}

impl ServerConfig {
    /// Reads `ROOTVIEW_WEB_CONFIG` (if set), then applies `ROOTVIEW_*`
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("ROOTVIEW_WEB_CONFIG") {
            Ok(path) => Self::from_toml_str(&std::fs::read_to_string(&path)?)?,
            Err(_) => ServerConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.engine.validate()?;

        if config.bind_addr.ip().is_unspecified() {
            tracing::warn!(
                "Listening on all interfaces ({}) without authentication. \
                 Anyone on the network can read and modify {}.",
                config.bind_addr,
                config.engine.browse.root.display()
            );
        }

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies environment-style overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("ROOTVIEW_ROOT") {
            self.engine.browse.root = PathBuf::from(root);
        }
        if let Some(dir) = lookup("ROOTVIEW_CACHE_DIR") {
            self.engine.thumbnails.cache_dir = PathBuf::from(dir);
        }
        if let Some(val) = lookup("ROOTVIEW_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse::<usize>() {
                self.engine.thumbnails.capacity = capacity;
            }
        }
        if let Some(val) = lookup("ROOTVIEW_MAX_UPLOAD_SIZE_MB") {
            if let Ok(mb) = val.parse::<usize>() {
                self.max_upload_size_mb = mb;
            }
        }
        if let Some(addr) = lookup("ROOTVIEW_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }
        if let Some(cert) = lookup("ROOTVIEW_TLS_CERT") {
            self.tls.cert_path = Some(cert);
        }
        if let Some(key) = lookup("ROOTVIEW_TLS_KEY") {
            self.tls.key_path = Some(key);
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}
