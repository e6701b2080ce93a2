//! Configuration management for rootview.
//!
//! Engine settings ([`settings::Config`]) are stored as a TOML file and
//! loaded once at startup.

pub mod settings;

pub use settings::{expand_home, BrowseConfig, Config, ThumbnailSettings};
