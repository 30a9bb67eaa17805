//! Registry errors

use thiserror::Error;

use crate::aggregate::AggregateError;
use crate::cache::CacheError;
use crate::persist::PersistError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Dataset registry and column storage errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Column '{column}' not found in dataset {dataset}")]
    ColumnNotFound { dataset: String, column: String },

    #[error("Unknown diffexp category '{category}' for dataset {dataset}")]
    UnknownDiffExpCategory { dataset: String, category: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed column file {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Registry lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl RegistryError {
    pub(crate) fn column_not_found(dataset: &str, column: &str) -> Self {
        RegistryError::ColumnNotFound {
            dataset: dataset.to_string(),
            column: column.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::DatasetNotFound(_) => "OBSMETA_DATASET_NOT_FOUND",
            RegistryError::ColumnNotFound { .. } => "OBSMETA_COLUMN_NOT_FOUND",
            RegistryError::UnknownDiffExpCategory { .. } => "OBSMETA_UNKNOWN_DIFFEXP_CATEGORY",
            RegistryError::Io { .. } => "OBSMETA_REGISTRY_IO",
            RegistryError::Malformed { .. } => "OBSMETA_MALFORMED_COLUMNS",
            RegistryError::LockPoisoned => "OBSMETA_REGISTRY_LOCK_POISONED",
            RegistryError::Cache(e) => e.code(),
            RegistryError::Aggregate(e) => e.code(),
            RegistryError::Persist(e) => e.code(),
        }
    }
}
