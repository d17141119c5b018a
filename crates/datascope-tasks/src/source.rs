//! Table sources and providers.
//!
//! A [`TableSource`] abstracts where a table's rows come from so the
//! coordinator can read row counts, bounded chunks, and samples without
//! knowing whether the backing store is an in-memory DataFrame or a CSV
//! file on disk. A [`TableProvider`] resolves a submitted `table_name` to
//! a source; unknown names are input errors that fail the task.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use datascope_stats::sample::sample_rows;
use polars::prelude::*;

use crate::error::{Result, TaskError};

/// Chunk size used when sampling a large source piecewise.
const SAMPLE_CHUNK_ROWS: usize = 50_000;

/// Read access to one table's rows.
pub trait TableSource: Send + Sync {
    /// Total number of data rows.
    fn row_count(&self) -> Result<usize>;

    /// Column names in table order.
    fn column_names(&self) -> Result<Vec<String>>;

    /// Read a bounded slice of rows starting at `offset`. A chunk that
    /// extends past the end is truncated; an offset past the end yields an
    /// empty frame with the table's schema.
    fn read_chunk(&self, offset: usize, len: usize) -> Result<DataFrame>;

    /// Draw up to `n` rows without materializing the full table. The
    /// default walks the table in fixed-size chunks and samples each
    /// chunk's proportional share.
    fn sample_rows(&self, n: usize, seed: Option<u64>) -> Result<DataFrame> {
        let total = self.row_count()?;
        if total <= n {
            return self.read_chunk(0, total.max(1));
        }

        let mut out: Option<DataFrame> = None;
        let mut offset = 0;
        let mut remaining = n;
        while offset < total && remaining > 0 {
            let len = SAMPLE_CHUNK_ROWS.min(total - offset);
            let chunk = self.read_chunk(offset, len)?;
            let share = ((n as f64) * (len as f64) / (total as f64)).ceil() as usize;
            let take = share.clamp(1, remaining).min(chunk.height());
            // Offset the seed per chunk so chunks draw distinct streams.
            let sampled = sample_rows(&chunk, take, seed.map(|s| s.wrapping_add(offset as u64)))?;
            remaining = remaining.saturating_sub(sampled.height());
            match out.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&sampled)?;
                }
                None => out = Some(sampled),
            }
            offset += len;
        }
        out.ok_or_else(|| TaskError::Internal("sampling produced no rows".to_string()))
    }
}

/// An in-memory table.
pub struct DataFrameSource {
    df: DataFrame,
}

impl DataFrameSource {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }
}

impl TableSource for DataFrameSource {
    fn row_count(&self) -> Result<usize> {
        Ok(self.df.height())
    }

    fn column_names(&self) -> Result<Vec<String>> {
        Ok(self
            .df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect())
    }

    fn read_chunk(&self, offset: usize, len: usize) -> Result<DataFrame> {
        Ok(self.df.slice(offset as i64, len))
    }

    fn sample_rows(&self, n: usize, seed: Option<u64>) -> Result<DataFrame> {
        Ok(sample_rows(&self.df, n, seed)?)
    }
}

/// A CSV file read in bounded slices, never fully materialized.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_options(&self) -> CsvReadOptions {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
    }

    fn reader(&self, options: CsvReadOptions) -> Result<DataFrame> {
        Ok(options
            .try_into_reader_with_file_path(Some(self.path.clone()))?
            .finish()?)
    }
}

impl TableSource for CsvSource {
    fn row_count(&self) -> Result<usize> {
        // Project a single column so counting never parses the full width.
        let df = self.reader(self.read_options().with_projection(Some(Arc::new(vec![0]))))?;
        Ok(df.height())
    }

    fn column_names(&self) -> Result<Vec<String>> {
        let df = self.reader(self.read_options().with_n_rows(Some(1)))?;
        Ok(df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect())
    }

    fn read_chunk(&self, offset: usize, len: usize) -> Result<DataFrame> {
        self.reader(
            self.read_options()
                .with_skip_rows_after_header(offset)
                .with_n_rows(Some(len)),
        )
    }
}

/// Resolves submitted table names to sources.
pub trait TableProvider: Send + Sync {
    fn open(&self, table_name: &str) -> Result<Box<dyn TableSource>>;
}

/// Provider over a directory of CSV files; `table_name` is the file name.
pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TableProvider for CsvDirProvider {
    fn open(&self, table_name: &str) -> Result<Box<dyn TableSource>> {
        // Reject path traversal in submitted names.
        let name = Path::new(table_name);
        if name.components().count() != 1 {
            return Err(TaskError::TableNotFound(table_name.to_string()));
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(TaskError::TableNotFound(table_name.to_string()));
        }
        Ok(Box::new(CsvSource::new(path)))
    }
}

/// Provider over registered in-memory DataFrames, used by tests and
/// embedding callers.
#[derive(Default)]
pub struct MemoryProvider {
    tables: parking_lot::RwLock<HashMap<String, DataFrame>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, table_name: impl Into<String>, df: DataFrame) {
        self.tables.write().insert(table_name.into(), df);
    }
}

impl TableProvider for MemoryProvider {
    fn open(&self, table_name: &str) -> Result<Box<dyn TableSource>> {
        self.tables
            .read()
            .get(table_name)
            .cloned()
            .map(|df| Box::new(DataFrameSource::new(df)) as Box<dyn TableSource>)
            .ok_or_else(|| TaskError::TableNotFound(table_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: usize) -> DataFrame {
        let values: Vec<f64> = (0..rows).map(|i| i as f64).collect();
        let labels: Vec<String> = (0..rows).map(|i| format!("row{i}")).collect();
        DataFrame::new(vec![
            Series::new("value".into(), &values).into(),
            Series::new("label".into(), &labels).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_dataframe_source_basics() {
        let source = DataFrameSource::new(frame(10));
        assert_eq!(source.row_count().unwrap(), 10);
        assert_eq!(source.column_names().unwrap(), vec!["value", "label"]);
    }

    #[test]
    fn test_read_chunk_truncates_at_end() {
        let source = DataFrameSource::new(frame(10));
        let chunk = source.read_chunk(8, 5).unwrap();
        assert_eq!(chunk.height(), 2);
    }

    #[test]
    fn test_read_chunk_past_end_is_empty() {
        let source = DataFrameSource::new(frame(10));
        let chunk = source.read_chunk(20, 5).unwrap();
        assert_eq!(chunk.height(), 0);
        assert_eq!(chunk.width(), 2);
    }

    #[test]
    fn test_sample_rows_small_table_returns_all() {
        let source = DataFrameSource::new(frame(10));
        let sample = source.sample_rows(100, Some(7)).unwrap();
        assert_eq!(sample.height(), 10);
    }

    #[test]
    fn test_sample_rows_bounded() {
        let source = DataFrameSource::new(frame(500));
        let sample = source.sample_rows(50, Some(7)).unwrap();
        assert_eq!(sample.height(), 50);
    }

    #[test]
    fn test_sample_rows_seeded_is_deterministic() {
        let source = DataFrameSource::new(frame(500));
        let a = source.sample_rows(50, Some(7)).unwrap();
        let b = source.sample_rows(50, Some(7)).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_memory_provider_unknown_table() {
        let provider = MemoryProvider::new();
        assert!(matches!(
            provider.open("missing"),
            Err(TaskError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_memory_provider_roundtrip() {
        let provider = MemoryProvider::new();
        provider.register("t", frame(5));
        let source = provider.open("t").unwrap();
        assert_eq!(source.row_count().unwrap(), 5);
    }

    #[test]
    fn test_csv_dir_provider_rejects_traversal() {
        let provider = CsvDirProvider::new("/tmp");
        assert!(matches!(
            provider.open("../etc/passwd"),
            Err(TaskError::TableNotFound(_))
        ));
    }
}
