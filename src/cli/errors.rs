//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero exit status.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::persist::PersistError;
use crate::registry::RegistryError;
use crate::schema::SchemaError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout, document files)
    IoError,
    /// Malformed argument such as a `key=value` default
    InvalidArgument,
    /// The document has validation problems
    ValidationFailed,
    /// Registry, column storage or cache failure
    DatasetError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "OBSMETA_CLI_CONFIG_ERROR",
            Self::IoError => "OBSMETA_CLI_IO_ERROR",
            Self::InvalidArgument => "OBSMETA_CLI_INVALID_ARGUMENT",
            Self::ValidationFailed => "OBSMETA_CLI_VALIDATION_FAILED",
            Self::DatasetError => "OBSMETA_CLI_DATASET_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid argument
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    /// Validation found problems
    pub fn validation_failed(dataset_id: &str, problems: usize) -> Self {
        Self::new(
            CliErrorCode::ValidationFailed,
            format!("{} problem(s) found in dataset {}", problems, dataset_id),
        )
    }

    /// Dataset access failed
    pub fn dataset_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::DatasetError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<PersistError> for CliError {
    fn from(e: PersistError) -> Self {
        Self::io_error(format!("{}: {}", e.code(), e))
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        Self::dataset_error(format!("{}: {}", e.code(), e))
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        match e.code() {
            crate::schema::SchemaErrorCode::InvalidDefault => Self::invalid_argument(e.to_string()),
            _ => Self::dataset_error(e.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
