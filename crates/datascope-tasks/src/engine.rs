//! Engine facade: submission, status, and result reads.

use std::sync::Arc;

use chrono::Utc;
use datascope_stats::{ColumnStatistics, DatasetStatistics};
use tracing::info;

use crate::config::EngineConfig;
use crate::coordinator::Coordinator;
use crate::error::{Result, TaskError};
use crate::queue::{TaskQueue, WorkerPool};
use crate::source::TableProvider;
use crate::store::StatsStore;
use crate::task::{generate_task_id, TaskRecord, TaskStatus};

/// The public entry point: owns the store, queue, and worker pool.
///
/// `submit` returns immediately; progress and results are observed
/// through `get_status`, `get_column_stats`, and `get_dataset_stats`.
/// Concurrent submissions for the same `table_id` are allowed; the
/// statistics tables follow last-write-wins upsert semantics.
///
/// # Example
///
/// ```rust,ignore
/// use datascope_tasks::{EngineConfig, MemoryStore, CsvDirProvider, StatsEngine};
/// use std::sync::Arc;
///
/// let engine = StatsEngine::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(CsvDirProvider::new("data")),
///     EngineConfig::default(),
/// )?;
/// let task_id = engine.submit("sales", "sales.csv")?;
/// let status = engine.get_status(&task_id)?;
/// ```
pub struct StatsEngine {
    store: Arc<dyn StatsStore>,
    queue: TaskQueue,
    pool: Option<WorkerPool>,
}

impl StatsEngine {
    /// Construct an engine and start its worker pool.
    pub fn new(
        store: Arc<dyn StatsStore>,
        provider: Arc<dyn TableProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| TaskError::InvalidConfig(e.to_string()))?;

        let coordinator = Arc::new(Coordinator::new(store.clone(), provider, config.clone()));
        let (queue, receiver) = TaskQueue::bounded(config.queue_capacity);
        let pool = WorkerPool::start(
            config.workers,
            config.poll_timeout,
            receiver,
            coordinator,
            store.clone(),
        );
        Ok(Self {
            store,
            queue,
            pool: Some(pool),
        })
    }

    /// Create a pending task for `table_name` and enqueue it.
    ///
    /// `table_id` is an opaque grouping key chosen by the caller and may
    /// equal `table_name`. Returns the new task id without waiting for
    /// completion.
    pub fn submit(&self, table_id: &str, table_name: &str) -> Result<String> {
        let task_id = generate_task_id(Utc::now());
        let record = TaskRecord::new(task_id.clone(), table_id, table_name);
        self.store.put_task(record.clone())?;
        if let Err(e) = self.queue.submit(record) {
            // No worker will ever pick this task up; leave it terminal so
            // status pollers are not stranded on a pending record.
            self.store
                .set_status(&task_id, TaskStatus::Failed, &e.to_string())?;
            return Err(e);
        }
        info!(
            "Submitted task {} for table '{}' (source '{}')",
            task_id, table_id, table_name
        );
        Ok(task_id)
    }

    /// Latest committed status record for a task.
    pub fn get_status(&self, task_id: &str) -> Result<TaskRecord> {
        self.store.get_task(task_id)
    }

    /// One column's statistics; `None` means not yet computed.
    pub fn get_column_stats(
        &self,
        table_id: &str,
        column: &str,
    ) -> Result<Option<ColumnStatistics>> {
        self.store.get_column_stats(table_id, column)
    }

    /// The table's dataset statistics; `None` means not yet computed.
    pub fn get_dataset_stats(&self, table_id: &str) -> Result<Option<DatasetStatistics>> {
        self.store.get_dataset_stats(table_id)
    }

    /// Stop accepting work and join the workers. In-flight tasks finish
    /// first.
    pub fn shutdown(mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
    }
}
