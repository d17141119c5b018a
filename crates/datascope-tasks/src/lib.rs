//! Asynchronous statistics tasks over tabular sources.
//!
//! This crate wraps [`datascope_stats`] in a task engine: callers submit
//! a table for analysis and poll for status while a worker pool computes
//! and stores per-column and dataset-level statistics.
//!
//! - [`task`] — the task record and its status lifecycle.
//! - [`store`] — the status/results store ([`MemoryStore`] bundled).
//! - [`source`] — table sources (in-memory, CSV) and name resolution.
//! - [`config`] — engine configuration with validation.
//! - [`coordinator`] — the per-task algorithm: column phase, dataset
//!   phase, retries, timeouts, failure handling.
//! - [`queue`] — bounded queue and worker pool.
//! - [`engine`] — the [`StatsEngine`] facade tying it together.
//!
//! # Example
//!
//! ```rust,ignore
//! use datascope_tasks::{CsvDirProvider, EngineConfig, MemoryStore, StatsEngine};
//! use std::sync::Arc;
//!
//! let engine = StatsEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(CsvDirProvider::new("data")),
//!     EngineConfig::default(),
//! )?;
//! let task_id = engine.submit("sales", "sales.csv")?;
//! loop {
//!     let status = engine.get_status(&task_id)?;
//!     if status.status.is_terminal() {
//!         break;
//!     }
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod queue;
pub mod source;
pub mod store;
pub mod task;

pub use config::{ConfigValidationError, EngineConfig};
pub use coordinator::Coordinator;
pub use engine::StatsEngine;
pub use error::{Result, TaskError};
pub use queue::{TaskQueue, WorkerPool};
pub use source::{CsvDirProvider, CsvSource, DataFrameSource, MemoryProvider, TableProvider, TableSource};
pub use store::{MemoryStore, StatsStore};
pub use task::{generate_task_id, ParseTaskStatusError, TaskRecord, TaskStatus};
