//! Error type shared by the catalog, the sync controllers and the CLI
//!
//! Every variant aborts the loop that raised it. Work already committed to
//! the catalog stays valid, so the next run resumes from there.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Credential acquisition or refresh failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A listing or item request failed.
    #[error("Remote error: {0}")]
    Remote(String),

    /// The catalog could not be opened or queried.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Export destination collision.
    #[error("'{}' already exists!", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<r2d2::Error> for FetchError {
    fn from(e: r2d2::Error) -> Self {
        FetchError::StorageUnavailable(e.to_string())
    }
}

impl From<rusqlite::Error> for FetchError {
    fn from(e: rusqlite::Error) -> Self {
        FetchError::StorageUnavailable(e.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Remote(e.to_string())
    }
}

impl From<csv::Error> for FetchError {
    fn from(e: csv::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}

impl From<toml::de::Error> for FetchError {
    fn from(e: toml::de::Error) -> Self {
        FetchError::Config(e.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}

/// Result type alias using FetchError
pub type Result<T> = std::result::Result<T, FetchError>;
