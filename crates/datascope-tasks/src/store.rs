//! Durable status and results store.
//!
//! [`StatsStore`] is the system of record for task status and computed
//! statistics. Every write is a single-row upsert scoped to a unique key
//! (`task_id`, `(table_id, column)`, or `table_id`), so any ACID-capable
//! backend satisfies the contract without extra coordination; the bundled
//! [`MemoryStore`] provides it with a `parking_lot` lock per table.
//!
//! The store — not its callers — enforces the task lifecycle invariants:
//! no transition out of a terminal state, progress monotone non-decreasing
//! while processing, and `completed_at` set exactly on completion.

use std::collections::HashMap;

use chrono::Utc;
use datascope_stats::{ColumnStatistics, DatasetStatistics};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, TaskError};
use crate::task::{TaskRecord, TaskStatus};

/// Store of task records and statistics results.
///
/// Implementations must make each method an atomic single-row operation.
pub trait StatsStore: Send + Sync {
    /// Insert a fresh task record (upsert keyed by `task_id`).
    fn put_task(&self, record: TaskRecord) -> Result<()>;

    /// Read a task record.
    fn get_task(&self, task_id: &str) -> Result<TaskRecord>;

    /// Transition a task to a new status, updating message (and progress
    /// where the transition implies one). Illegal transitions are ignored
    /// with a warning rather than corrupting a terminal record.
    fn set_status(&self, task_id: &str, status: TaskStatus, message: &str) -> Result<()>;

    /// Update progress and message for a processing task. Regressing
    /// progress values are clamped so observers always see a
    /// non-decreasing sequence.
    fn update_progress(&self, task_id: &str, progress: f64, message: &str) -> Result<()>;

    /// Upsert one column's statistics, keyed by `(table_id, column)`.
    fn upsert_column_stats(
        &self,
        table_id: &str,
        column: &str,
        stats: ColumnStatistics,
    ) -> Result<()>;

    /// Read one column's statistics; `None` means not yet computed.
    fn get_column_stats(&self, table_id: &str, column: &str) -> Result<Option<ColumnStatistics>>;

    /// Upsert the dataset statistics, keyed by `table_id`.
    fn upsert_dataset_stats(&self, table_id: &str, stats: DatasetStatistics) -> Result<()>;

    /// Read the dataset statistics; `None` means not yet computed.
    fn get_dataset_stats(&self, table_id: &str) -> Result<Option<DatasetStatistics>>;
}

/// In-memory store backed by `parking_lot::RwLock`-guarded maps.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    column_stats: RwLock<HashMap<(String, String), ColumnStatistics>>,
    dataset_stats: RwLock<HashMap<String, DatasetStatistics>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for MemoryStore {
    fn put_task(&self, record: TaskRecord) -> Result<()> {
        self.tasks.write().insert(record.task_id.clone(), record);
        Ok(())
    }

    fn get_task(&self, task_id: &str) -> Result<TaskRecord> {
        self.tasks
            .read()
            .get(task_id)
            .cloned()
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))
    }

    fn set_status(&self, task_id: &str, status: TaskStatus, message: &str) -> Result<()> {
        let mut tasks = self.tasks.write();
        let record = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;

        if !record.status.can_transition_to(status) {
            debug!(
                "Ignoring illegal transition {} -> {} for task {}",
                record.status.as_str(),
                status.as_str(),
                task_id
            );
            return Ok(());
        }

        record.status = status;
        record.message = message.to_string();
        match status {
            TaskStatus::Completed => {
                record.progress = 1.0;
                record.completed_at = Some(Utc::now());
            }
            TaskStatus::Failed => {
                // Progress stays where it was; completed_at stays unset.
            }
            _ => {}
        }
        Ok(())
    }

    fn update_progress(&self, task_id: &str, progress: f64, message: &str) -> Result<()> {
        let mut tasks = self.tasks.write();
        let record = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;

        if record.status != TaskStatus::Processing {
            debug!(
                "Ignoring progress update for non-processing task {} ({})",
                task_id,
                record.status.as_str()
            );
            return Ok(());
        }
        // Monotonicity guard: never let an observer see progress move back.
        record.progress = record.progress.max(progress.clamp(0.0, 1.0));
        record.message = message.to_string();
        Ok(())
    }

    fn upsert_column_stats(
        &self,
        table_id: &str,
        column: &str,
        stats: ColumnStatistics,
    ) -> Result<()> {
        self.column_stats
            .write()
            .insert((table_id.to_string(), column.to_string()), stats);
        Ok(())
    }

    fn get_column_stats(&self, table_id: &str, column: &str) -> Result<Option<ColumnStatistics>> {
        Ok(self
            .column_stats
            .read()
            .get(&(table_id.to_string(), column.to_string()))
            .cloned())
    }

    fn upsert_dataset_stats(&self, table_id: &str, stats: DatasetStatistics) -> Result<()> {
        self.dataset_stats.write().insert(table_id.to_string(), stats);
        Ok(())
    }

    fn get_dataset_stats(&self, table_id: &str) -> Result<Option<DatasetStatistics>> {
        Ok(self.dataset_stats.read().get(table_id).cloned())
    }
}
