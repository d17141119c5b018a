//! Error types for the statistics calculators.
//!
//! A small `thiserror` hierarchy with machine-readable error codes. Failures
//! of individual sub-computations (a histogram, an entropy value) are never
//! surfaced through this type — they are absorbed at the call site and
//! replaced with empty payloads. `StatsError` covers the failures that make
//! a whole column or dataset computation impossible.

use thiserror::Error;

/// The main error type for statistics computation.
#[derive(Error, Debug)]
pub enum StatsError {
    /// Column was not found in the frame.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Column could not be cast to a numeric representation.
    #[error("Failed to convert column '{column}' to numeric: {reason}")]
    NumericConversionFailed { column: String, reason: String },

    /// The table has no columns to analyze.
    #[error("No columns found")]
    NoColumns,

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StatsError {
    /// Get error code for machine-readable classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NumericConversionFailed { .. } => "NUMERIC_CONVERSION_FAILED",
            Self::NoColumns => "NO_COLUMNS",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

/// Result type alias for statistics operations.
pub type Result<T> = std::result::Result<T, StatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            StatsError::ColumnNotFound("age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(StatsError::NoColumns.error_code(), "NO_COLUMNS");
    }

    #[test]
    fn test_error_display() {
        let err = StatsError::NumericConversionFailed {
            column: "price".to_string(),
            reason: "unsupported dtype".to_string(),
        };
        assert!(err.to_string().contains("price"));
        assert!(err.to_string().contains("unsupported dtype"));
    }
}
