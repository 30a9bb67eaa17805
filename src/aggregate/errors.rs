//! Aggregation errors

use thiserror::Error;

/// Result type for aggregation operations
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Aggregation and binning errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// No usable (non-missing) rows
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Length mismatch: {left} values against {right} categories")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid bin count: {0} (expected 1..=99)")]
    InvalidBinCount(usize),
}

impl AggregateError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AggregateError::EmptyInput(_) => "OBSMETA_EMPTY_INPUT",
            AggregateError::LengthMismatch { .. } => "OBSMETA_LENGTH_MISMATCH",
            AggregateError::InvalidBinCount(_) => "OBSMETA_INVALID_BIN_COUNT",
        }
    }
}
