//! Error types for intelcache

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cache directory unavailable: {0}")]
    CacheDir(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("publish failed for {path}: {source}")]
    Publish {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn cache_dir(reason: impl Into<String>) -> Self {
        Self::CacheDir(reason.into())
    }

    pub fn publish(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Publish {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
