//! Error types for task coordination.

use datascope_stats::StatsError;
use thiserror::Error;

/// The main error type for the task engine.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task was not found in the status store.
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    /// The requested table source does not exist or is unreadable.
    #[error("Table '{0}' not found or unreadable")]
    TableNotFound(String),

    /// The table has no columns to analyze.
    #[error("No columns found")]
    NoColumns,

    /// Task exceeded its hard wall-clock timeout.
    #[error("Task timed out after {elapsed_secs} seconds")]
    TimedOut { elapsed_secs: u64 },

    /// A subtask exhausted its retries.
    #[error("Subtask '{subtask}' failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        subtask: String,
        attempts: u32,
        reason: String,
    },

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The task queue is shut down or full.
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    /// Statistics computation error.
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (e.g., a worker panic).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskError {
    /// Get error code for machine-readable classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TaskNotFound(_) => "TASK_NOT_FOUND",
            Self::TableNotFound(_) => "TABLE_NOT_FOUND",
            Self::NoColumns => "NO_COLUMNS",
            Self::TimedOut { .. } => "TIMED_OUT",
            Self::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::QueueUnavailable(_) => "QUEUE_UNAVAILABLE",
            Self::Stats(_) => "STATS_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Input errors fail the task immediately, without retries.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::TableNotFound(_) | Self::NoColumns | Self::InvalidConfig(_)
        )
    }
}

/// Result type alias for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;
