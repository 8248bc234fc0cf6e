//! Error types for the filename index system.

use thiserror::Error;

/// Errors produced while building, loading, or querying an index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index build failed: {0}")]
    BuildFailed(String),

    #[error("corrupt index: {0}")]
    Corrupt(String),

    #[error("invalid search pattern: {0}")]
    PatternInvalid(#[from] regex::Error),

    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced at the manager boundary
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("path is not absolute: {0}")]
    NotAbsolute(String),

    #[error("path is already indexed or building: {0}")]
    AlreadyIndexed(String),

    #[error("path is not on a known mount: {0}")]
    UnknownMount(String),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ManagerError {
    fn from(err: config::ConfigError) -> Self {
        ManagerError::Config(err.to_string())
    }
}
