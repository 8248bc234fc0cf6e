//! Configuration for the index manager.
//!
//! A `ManagerConfig` can be built in code, loaded from a TOML file, or
//! overridden through `LFT_*` environment variables; every field has a
//! usable default.

use crate::error::ManagerError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Organization segment of the system cache path.
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Application segment of the system cache path.
    #[serde(default = "default_application")]
    pub application: String,

    /// Explicit cache directory; overrides system/user resolution.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Mount-point prefixes eligible for automatic indexing when a mount
    /// appears. Each entry ends with a separator; an empty list disables
    /// auto-indexing.
    #[serde(default = "default_auto_index_roots")]
    pub auto_index_roots: Vec<String>,

    /// Result batch size for range scans.
    #[serde(default = "default_search_chunk_size")]
    pub search_chunk_size: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_organization() -> String {
    "lft".to_string()
}

fn default_application() -> String {
    "indexes".to_string()
}

fn default_search_chunk_size() -> usize {
    1000
}

fn default_auto_index_roots() -> Vec<String> {
    match std::env::var("USER") {
        Ok(user) if !user.is_empty() => vec![format!("/media/{user}/")],
        _ => Vec::new(),
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            organization: default_organization(),
            application: default_application(),
            cache_dir: None,
            auto_index_roots: default_auto_index_roots(),
            search_chunk_size: default_search_chunk_size(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Whether `mount_point` falls under one of the auto-index roots.
    pub(crate) fn auto_index_allows(&self, mount_point: &str) -> bool {
        self.auto_index_roots
            .iter()
            .any(|root| mount_point.starts_with(root.as_str()))
    }
}

/// Layered configuration loading: file first, then `LFT_*` environment
/// overrides (e.g. `LFT_ORGANIZATION`, `LFT_SEARCH_CHUNK_SIZE`).
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: Option<&Path>) -> Result<ManagerConfig, ManagerError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix("LFT").separator("__"))
            .build()?;
        let config = settings.try_deserialize::<ManagerConfig>()?;
        Ok(config)
    }
}
