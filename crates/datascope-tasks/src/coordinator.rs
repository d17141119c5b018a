//! Statistics task coordinator.
//!
//! Executes one task end to end: resolve the table, compute and store
//! per-column statistics (whole-table or chunked depending on size),
//! compute and store the dataset statistics from a bounded sample, and
//! drive the task record through its lifecycle. Any failure is caught
//! here and recorded on the task; nothing propagates to the dispatcher.
//!
//! Progress layout: 0.05 after resolving the table, 0.05→0.80 across the
//! column phase, 0.80→0.95 across the dataset phase, 1.00 on completion.
//! Progress is always derived from a column's static index, so it stays
//! monotone even when a parallel batch finishes out of order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use datascope_stats::{
    classify_columns, classify_series, compute_column_stats, compute_dataset_stats, ColumnKind,
    ColumnStatistics, StatsOptions,
};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Result, TaskError};
use crate::source::{TableProvider, TableSource};
use crate::store::StatsStore;
use crate::task::{TaskRecord, TaskStatus};

const COLUMN_PHASE_START: f64 = 0.05;
const COLUMN_PHASE_END: f64 = 0.8;
const DATASET_PHASE_END: f64 = 0.95;

/// Runs the per-task statistics algorithm against a store and a provider.
pub struct Coordinator {
    store: Arc<dyn StatsStore>,
    provider: Arc<dyn TableProvider>,
    config: EngineConfig,
}

/// Wall-clock budget for one task, checked at column/chunk boundaries.
struct Deadline {
    started: Instant,
    config: EngineConfig,
    soft_warned: AtomicBool,
}

impl Deadline {
    fn new(config: &EngineConfig) -> Self {
        Self {
            started: Instant::now(),
            config: config.clone(),
            soft_warned: AtomicBool::new(false),
        }
    }

    fn check(&self, task_id: &str) -> Result<()> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.config.hard_timeout {
            return Err(TaskError::TimedOut {
                elapsed_secs: elapsed.as_secs(),
            });
        }
        if elapsed >= self.config.soft_timeout && !self.soft_warned.swap(true, Ordering::Relaxed) {
            warn!(
                "Task {} exceeded soft timeout ({}s elapsed), wrapping up",
                task_id,
                elapsed.as_secs()
            );
        }
        Ok(())
    }
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn StatsStore>,
        provider: Arc<dyn TableProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// Execute one task to a terminal state. Never returns an error: any
    /// failure is recorded on the task record instead.
    pub fn run(&self, task: &TaskRecord) {
        let started = Instant::now();
        if let Err(e) = self
            .store
            .set_status(&task.task_id, TaskStatus::Processing, "Analysis started")
        {
            warn!("Could not mark task {} processing: {}", task.task_id, e);
            return;
        }
        info!(
            "Task {} started for table '{}' (source '{}')",
            task.task_id, task.table_id, task.table_name
        );

        match self.execute(task) {
            Ok(()) => {
                info!(
                    "Task {} completed in {:.1}s",
                    task.task_id,
                    started.elapsed().as_secs_f64()
                );
            }
            Err(e) => {
                warn!(
                    "Task {} failed after {:.1}s: {} [{}]",
                    task.task_id,
                    started.elapsed().as_secs_f64(),
                    e,
                    e.error_code()
                );
                // The error message is recorded verbatim for diagnosis.
                if let Err(store_err) =
                    self.store
                        .set_status(&task.task_id, TaskStatus::Failed, &e.to_string())
                {
                    warn!("Could not mark task {} failed: {}", task.task_id, store_err);
                }
            }
        }
    }

    fn execute(&self, task: &TaskRecord) -> Result<()> {
        let deadline = Deadline::new(&self.config);
        let source = self.provider.open(&task.table_name)?;

        let rows = source.row_count()?;
        let columns = source.column_names()?;
        if columns.is_empty() {
            return Err(TaskError::NoColumns);
        }

        self.store.update_progress(
            &task.task_id,
            COLUMN_PHASE_START,
            &format!("Analyzing {} rows across {} columns", rows, columns.len()),
        )?;

        if rows > self.config.large_table_threshold {
            self.run_columns_chunked(task, &deadline, source.as_ref(), rows, &columns)?;
        } else {
            self.run_columns_whole(task, &deadline, source.as_ref(), rows, &columns)?;
        }

        self.run_dataset_phase(task, &deadline, source.as_ref(), rows)?;

        self.store
            .set_status(&task.task_id, TaskStatus::Completed, "Analysis complete")?;
        Ok(())
    }

    // ==================== column phase ====================

    /// Small-table path: one full read, columns in table order.
    fn run_columns_whole(
        &self,
        task: &TaskRecord,
        deadline: &Deadline,
        source: &dyn TableSource,
        rows: usize,
        columns: &[String],
    ) -> Result<()> {
        let df = source.read_chunk(0, rows.max(1))?;
        let plan: Vec<(usize, String, ColumnKind)> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = df
                    .column(name)
                    .map(|c| classify_series(c.as_materialized_series()))
                    .unwrap_or(ColumnKind::Other);
                (i, name.clone(), kind)
            })
            .collect();

        self.process_column_plan(task, deadline, &plan, |name| {
            Ok(df.column(name)?.as_materialized_series().clone())
        })
    }

    /// Large-table path: classify from a bounded sample, order columns
    /// numeric → categorical → other, and concatenate each column across
    /// fixed-size chunks so the full table is never resident at once.
    fn run_columns_chunked(
        &self,
        task: &TaskRecord,
        deadline: &Deadline,
        source: &dyn TableSource,
        rows: usize,
        columns: &[String],
    ) -> Result<()> {
        let sample = source.sample_rows(self.config.classify_sample_rows, self.config.sample_seed)?;
        let kinds = classify_columns(&sample);
        debug!(
            "Classified {} columns from a {}-row sample",
            kinds.len(),
            sample.height()
        );

        let kind_of = |name: &str| -> ColumnKind {
            kinds
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, k)| *k)
                .unwrap_or(ColumnKind::Other)
        };

        // Numeric first, then categorical, then other: the statistics most
        // likely to matter land earliest if the task is inspected mid-run.
        let mut plan: Vec<(usize, String, ColumnKind)> = columns
            .iter()
            .map(|name| (0, name.clone(), kind_of(name)))
            .collect();
        plan.sort_by_key(|(_, _, kind)| match kind {
            ColumnKind::Numeric => 0,
            ColumnKind::Categorical => 1,
            ColumnKind::Other => 2,
        });
        for (i, entry) in plan.iter_mut().enumerate() {
            entry.0 = i;
        }

        let chunk_size = self.config.chunk_size;
        self.process_column_plan(task, deadline, &plan, |name| {
            gather_column(source, rows, chunk_size, name)
        })
    }

    /// Process a classified column plan in batches, honoring the batch
    /// join barrier and static-index progress.
    fn process_column_plan<F>(
        &self,
        task: &TaskRecord,
        deadline: &Deadline,
        plan: &[(usize, String, ColumnKind)],
        fetch: F,
    ) -> Result<()>
    where
        F: Fn(&str) -> Result<Series> + Sync,
    {
        let total = plan.len();
        let opts = self.stats_options();

        for batch in plan.chunks(self.config.column_batch_size) {
            deadline.check(&task.task_id)?;

            if self.config.parallel_columns && batch.len() > 1 {
                thread::scope(|scope| -> Result<()> {
                    let handles: Vec<_> = batch
                        .iter()
                        .map(|(_, name, kind)| {
                            let fetch = &fetch;
                            let opts = &opts;
                            scope.spawn(move || -> Result<ColumnStatistics> {
                                self.with_retry(&format!("column '{name}'"), || {
                                    let series = fetch(name)?;
                                    Ok(compute_column_stats(&series, *kind, opts)?)
                                })
                            })
                        })
                        .collect();

                    for (handle, (_, name, _)) in handles.into_iter().zip(batch) {
                        let stats = handle.join().map_err(|_| {
                            TaskError::Internal(format!("column worker panicked on '{name}'"))
                        })??;
                        self.store
                            .upsert_column_stats(&task.table_id, name, stats)?;
                    }
                    Ok(())
                })?;

                // Batch done: report from the batch's last static index.
                let (idx, name, _) = &batch[batch.len() - 1];
                self.report_column_progress(&task.task_id, *idx, total, name)?;
            } else {
                for (idx, name, kind) in batch {
                    deadline.check(&task.task_id)?;
                    let stats = self.with_retry(&format!("column '{name}'"), || {
                        let series = fetch(name)?;
                        Ok(compute_column_stats(&series, *kind, &opts)?)
                    })?;
                    self.store
                        .upsert_column_stats(&task.table_id, name, stats)?;
                    self.report_column_progress(&task.task_id, *idx, total, name)?;
                }
            }
        }
        Ok(())
    }

    fn report_column_progress(
        &self,
        task_id: &str,
        index: usize,
        total: usize,
        name: &str,
    ) -> Result<()> {
        let fraction = (index + 1) as f64 / total as f64;
        let progress = COLUMN_PHASE_START + fraction * (COLUMN_PHASE_END - COLUMN_PHASE_START);
        self.store.update_progress(
            task_id,
            progress,
            &format!("Processing column {}/{}: {}", index + 1, total, name),
        )
    }

    // ==================== dataset phase ====================

    fn run_dataset_phase(
        &self,
        task: &TaskRecord,
        deadline: &Deadline,
        source: &dyn TableSource,
        rows: usize,
    ) -> Result<()> {
        deadline.check(&task.task_id)?;
        self.store.update_progress(
            &task.task_id,
            COLUMN_PHASE_END,
            "Computing dataset-level statistics",
        )?;

        let sample = self.dataset_sample(source, rows)?;
        debug!(
            "Dataset phase for table '{}' uses {} of {} rows",
            task.table_id,
            sample.height(),
            rows
        );

        let opts = self.stats_options();
        let stats = self.with_retry("dataset statistics", || {
            Ok(compute_dataset_stats(&sample, &opts)?)
        })?;
        self.store.upsert_dataset_stats(&task.table_id, stats)?;

        self.store.update_progress(
            &task.task_id,
            DATASET_PHASE_END,
            "Dataset statistics stored",
        )?;
        Ok(())
    }

    /// Sampling strategy driven purely by row count: small tables are used
    /// whole, mid-size tables accumulate a bounded sample across chunks,
    /// and very large tables draw a single sample proportional to size.
    fn dataset_sample(&self, source: &dyn TableSource, rows: usize) -> Result<DataFrame> {
        if rows <= self.config.max_sample_size {
            return source.read_chunk(0, rows.max(1));
        }
        let n = if rows >= self.config.large_table_threshold {
            (rows / 100).max(1000).min(self.config.max_sample_size)
        } else {
            self.config.max_sample_size
        };
        source.sample_rows(n, self.config.sample_seed)
    }

    // ==================== helpers ====================

    fn stats_options(&self) -> StatsOptions {
        StatsOptions {
            seed: self.config.sample_seed,
            ..StatsOptions::default()
        }
    }

    /// Retry a subtask with exponential backoff. Input errors and
    /// timeouts are not retried; exhausting retries surfaces as a single
    /// error that fails the whole task.
    fn with_retry<T>(&self, subtask: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_input_error() || matches!(e, TaskError::TimedOut { .. }) => {
                    return Err(e);
                }
                Err(e) => {
                    if attempt as usize >= self.config.retry_attempts {
                        return Err(TaskError::RetriesExhausted {
                            subtask: subtask.to_string(),
                            attempts: attempt + 1,
                            reason: e.to_string(),
                        });
                    }
                    let delay = self.config.retry_base_delay * 2u32.pow(attempt);
                    warn!(
                        "Subtask {} failed (attempt {}), retrying in {:?}: {}",
                        subtask,
                        attempt + 1,
                        delay,
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

/// Concatenate one column across fixed-size chunks of the source.
fn gather_column(
    source: &dyn TableSource,
    rows: usize,
    chunk_size: usize,
    name: &str,
) -> Result<Series> {
    let mut out: Option<Series> = None;
    let mut offset = 0;
    while offset < rows {
        let len = chunk_size.min(rows - offset);
        let chunk = source.read_chunk(offset, len)?;
        let series = chunk.column(name)?.as_materialized_series().clone();
        match out.as_mut() {
            Some(acc) => {
                acc.append(&series)?;
            }
            None => out = Some(series),
        }
        offset += len;
    }
    out.ok_or_else(|| TaskError::Internal(format!("column '{name}' yielded no chunks")))
}
