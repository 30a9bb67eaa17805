//! Persistence errors

use std::path::Path;
use thiserror::Error;

/// Result type for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;

/// Metadata document persistence errors
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {reason}")]
    Yaml { path: String, reason: String },

    #[error("Cannot derive a dataset id from {0}")]
    InvalidPath(String),

    #[error("No free backup slot for {0}")]
    BackupExhausted(String),
}

impl PersistError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PersistError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn yaml(path: &Path, reason: impl std::fmt::Display) -> Self {
        PersistError::Yaml {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            PersistError::Io { .. } => "OBSMETA_PERSIST_IO",
            PersistError::Yaml { .. } => "OBSMETA_PERSIST_YAML",
            PersistError::InvalidPath(_) => "OBSMETA_PERSIST_INVALID_PATH",
            PersistError::BackupExhausted(_) => "OBSMETA_PERSIST_BACKUP_EXHAUSTED",
        }
    }
}
