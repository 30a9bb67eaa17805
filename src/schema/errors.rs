//! Schema error types
//!
//! Validation findings (problems, warnings, messages) are data, not errors.
//! `SchemaError` covers only the conditions that make a validation pass
//! meaningless:
//! - OBSMETA_SOURCE_UNAVAILABLE: the dataset or its raw columns cannot be read
//! - OBSMETA_INVALID_DEFAULT: a default override could not be parsed or coerced
//! - OBSMETA_DOCUMENT_SERIALIZATION: the document could not be canonicalised

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Registry or column storage failed for this dataset
    SourceUnavailable,
    /// Malformed `key=value` default
    InvalidDefault,
    /// Canonical serialization failed
    DocumentSerialization,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::SourceUnavailable => "OBSMETA_SOURCE_UNAVAILABLE",
            SchemaErrorCode::InvalidDefault => "OBSMETA_INVALID_DEFAULT",
            SchemaErrorCode::DocumentSerialization => "OBSMETA_DOCUMENT_SERIALIZATION",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with context
#[derive(Debug)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    dataset_id: Option<String>,
}

impl SchemaError {
    /// The observation source failed for a dataset
    pub fn source_unavailable(dataset_id: impl Into<String>, reason: impl fmt::Display) -> Self {
        let id = dataset_id.into();
        Self {
            code: SchemaErrorCode::SourceUnavailable,
            message: format!("Dataset '{}' unavailable: {}", id, reason),
            dataset_id: Some(id),
        }
    }

    /// A default override is malformed
    pub fn invalid_default(pair: &str, reason: impl fmt::Display) -> Self {
        Self {
            code: SchemaErrorCode::InvalidDefault,
            message: format!("Invalid default '{}': {}", pair, reason),
            dataset_id: None,
        }
    }

    /// Canonical serialization failed
    pub fn serialization(message: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::DocumentSerialization,
            message: message.into(),
            dataset_id: None,
        }
    }

    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn dataset_id(&self) -> Option<&str> {
        self.dataset_id.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::SourceUnavailable.code(), "OBSMETA_SOURCE_UNAVAILABLE");
        assert_eq!(SchemaErrorCode::InvalidDefault.code(), "OBSMETA_INVALID_DEFAULT");
    }

    #[test]
    fn test_source_unavailable_keeps_dataset() {
        let err = SchemaError::source_unavailable("pbmc", "obs file missing");
        assert_eq!(err.dataset_id(), Some("pbmc"));
        let display = err.to_string();
        assert!(display.starts_with("OBSMETA_SOURCE_UNAVAILABLE"));
        assert!(display.contains("obs file missing"));
    }
}
