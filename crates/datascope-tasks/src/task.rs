//! Task model: status lifecycle, records, and identifiers.
//!
//! A task is one request to compute statistics for a table. It moves
//! through `pending → processing → completed | failed`; the terminal
//! states are absorbing, and progress only ever increases while the task
//! is processing. Those invariants are enforced by the status store
//! ([`crate::store`]), not trusted to callers.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a statistics task.
///
/// Valid transitions: `Pending → Processing → Completed | Failed`.
/// [`Completed`](Self::Completed) and [`Failed`](Self::Failed) are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet picked up by a worker.
    #[default]
    Pending,
    /// A coordinator run is in progress.
    Processing,
    /// All statistics were computed and stored.
    Completed,
    /// The run failed; the record's message holds the reason.
    Failed,
}

impl TaskStatus {
    /// String representation used by status-polling clients.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Returns `true` if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Returns `true` if `next` is a legal transition from `self`.
    #[must_use]
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Pending, TaskStatus::Failed)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }
}

/// Error type for parsing a [`TaskStatus`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTaskStatusError {
    invalid_value: String,
}

impl ParseTaskStatusError {
    /// Returns the invalid value that caused the parse error.
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl std::fmt::Display for ParseTaskStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid task status: '{}'. Valid values are: pending, processing, completed, failed",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseTaskStatusError {}

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(ParseTaskStatusError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// Generate a task identifier embedding the creation time for
/// traceability, e.g. `stats_20260830T142501_a3f81c`.
pub fn generate_task_id(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0xFF_FFFF);
    format!("stats_{}_{:06x}", now.format("%Y%m%dT%H%M%S"), suffix)
}

/// The persisted status record for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task identifier.
    pub task_id: String,
    /// Logical grouping key for the computed statistics.
    pub table_id: String,
    /// Physical source the statistics are computed from.
    pub table_name: String,
    pub status: TaskStatus,
    /// Progress in `[0.0, 1.0]`, non-decreasing while processing.
    pub progress: f64,
    /// Human-readable description of the current step.
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Set exactly when the task enters `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// A fresh pending record.
    pub fn new(
        task_id: impl Into<String>,
        table_id: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            table_id: table_id.into(),
            table_name: table_name.into(),
            status: TaskStatus::Pending,
            progress: 0.0,
            message: "Task created".to_string(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}
