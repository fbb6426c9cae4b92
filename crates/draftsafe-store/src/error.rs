//! Error types for local caches.

use thiserror::Error;

/// Errors that can occur while reading or writing the local cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Cache key is too long for a file name ({len} bytes encoded)")]
    KeyTooLong { len: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
