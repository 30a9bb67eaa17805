//! Statistics cache errors
//!
//! These cover the store only. Errors raised by a wrapped computation
//! never become a `CacheError`; they reach the caller unchanged.

use thiserror::Error;

/// Result type for cache store operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Corrupt cache entry {digest}: {reason}")]
    Corrupt { digest: String, reason: String },
}

impl CacheError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::Io { .. } => "OBSMETA_CACHE_IO",
            CacheError::Serialization(_) => "OBSMETA_CACHE_SERIALIZATION",
            CacheError::LockPoisoned(_) => "OBSMETA_CACHE_LOCK_POISONED",
            CacheError::Corrupt { .. } => "OBSMETA_CACHE_CORRUPT",
        }
    }
}
