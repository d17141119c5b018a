//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::engine::StatsEngine`] and the coordinator.
///
/// All values have sensible defaults; use [`EngineConfig::builder()`] to
/// override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Row count above which a table is processed in chunks instead of
    /// being read whole.
    /// Default: 100,000
    pub large_table_threshold: usize,

    /// Rows per chunk on the chunked path.
    /// Default: 50,000
    pub chunk_size: usize,

    /// Rows sampled to classify column kinds on the chunked path.
    /// Default: 1,000
    pub classify_sample_rows: usize,

    /// Columns computed per parallel batch.
    /// Default: 5
    pub column_batch_size: usize,

    /// Worker threads consuming the task queue.
    /// Default: 2
    pub workers: usize,

    /// Whether columns within a batch are computed on parallel threads.
    /// Default: true
    pub parallel_columns: bool,

    /// Upper bound on rows sampled for dataset-level statistics.
    /// Default: 10,000
    pub max_sample_size: usize,

    /// Retries per failed subtask, beyond the first attempt.
    /// Default: 2
    pub retry_attempts: usize,

    /// Base delay for exponential retry backoff (base * 2^attempt).
    /// Default: 500ms
    pub retry_base_delay: Duration,

    /// Elapsed time after which a warning is logged at the next boundary.
    /// Default: 50 minutes
    pub soft_timeout: Duration,

    /// Elapsed time after which the task fails at the next boundary.
    /// Default: 60 minutes
    pub hard_timeout: Duration,

    /// Bounded task queue capacity.
    /// Default: 64
    pub queue_capacity: usize,

    /// How long an idle worker waits for a task before re-checking the
    /// shutdown flag.
    /// Default: 5 seconds
    pub poll_timeout: Duration,

    /// Seed for all sampling, for reproducible runs.
    /// If None, samples are entropy-seeded.
    /// Default: None
    pub sample_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            large_table_threshold: 100_000,
            chunk_size: 50_000,
            classify_sample_rows: 1_000,
            column_batch_size: 5,
            workers: 2,
            parallel_columns: true,
            max_sample_size: 10_000,
            retry_attempts: 2,
            retry_base_delay: Duration::from_millis(500),
            soft_timeout: Duration::from_secs(50 * 60),
            hard_timeout: Duration::from_secs(60 * 60),
            queue_capacity: 64,
            poll_timeout: Duration::from_secs(5),
            sample_seed: None,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.chunk_size == 0 {
            return Err(ConfigValidationError::ZeroField("chunk_size"));
        }
        if self.column_batch_size == 0 {
            return Err(ConfigValidationError::ZeroField("column_batch_size"));
        }
        if self.workers == 0 {
            return Err(ConfigValidationError::ZeroField("workers"));
        }
        if self.max_sample_size == 0 {
            return Err(ConfigValidationError::ZeroField("max_sample_size"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigValidationError::ZeroField("queue_capacity"));
        }
        if self.hard_timeout < self.soft_timeout {
            return Err(ConfigValidationError::TimeoutOrder {
                soft: self.soft_timeout,
                hard: self.hard_timeout,
            });
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid '{0}': must be at least 1")]
    ZeroField(&'static str),

    #[error("hard_timeout ({hard:?}) must be >= soft_timeout ({soft:?})")]
    TimeoutOrder { soft: Duration, hard: Duration },
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    large_table_threshold: Option<usize>,
    chunk_size: Option<usize>,
    classify_sample_rows: Option<usize>,
    column_batch_size: Option<usize>,
    workers: Option<usize>,
    parallel_columns: Option<bool>,
    max_sample_size: Option<usize>,
    retry_attempts: Option<usize>,
    retry_base_delay: Option<Duration>,
    soft_timeout: Option<Duration>,
    hard_timeout: Option<Duration>,
    queue_capacity: Option<usize>,
    poll_timeout: Option<Duration>,
    sample_seed: Option<u64>,
}

impl EngineConfigBuilder {
    /// Set the row count above which tables are processed in chunks.
    pub fn large_table_threshold(mut self, rows: usize) -> Self {
        self.large_table_threshold = Some(rows);
        self
    }

    /// Set the rows read per chunk on the chunked path.
    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = Some(rows);
        self
    }

    /// Set the rows sampled for column kind classification.
    pub fn classify_sample_rows(mut self, rows: usize) -> Self {
        self.classify_sample_rows = Some(rows);
        self
    }

    /// Set the number of columns computed per batch.
    pub fn column_batch_size(mut self, columns: usize) -> Self {
        self.column_batch_size = Some(columns);
        self
    }

    /// Set the number of worker threads.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Enable or disable parallel column computation within a batch.
    pub fn parallel_columns(mut self, parallel: bool) -> Self {
        self.parallel_columns = Some(parallel);
        self
    }

    /// Set the upper bound on rows sampled for dataset statistics.
    pub fn max_sample_size(mut self, rows: usize) -> Self {
        self.max_sample_size = Some(rows);
        self
    }

    /// Set the number of retries per failed subtask.
    pub fn retry_attempts(mut self, attempts: usize) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    /// Set the base delay for exponential retry backoff.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = Some(delay);
        self
    }

    /// Set the soft (warning) timeout.
    pub fn soft_timeout(mut self, timeout: Duration) -> Self {
        self.soft_timeout = Some(timeout);
        self
    }

    /// Set the hard (failing) timeout.
    pub fn hard_timeout(mut self, timeout: Duration) -> Self {
        self.hard_timeout = Some(timeout);
        self
    }

    /// Set the bounded queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set how long idle workers wait before re-checking shutdown.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Set a fixed sampling seed for reproducible runs.
    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            large_table_threshold: self
                .large_table_threshold
                .unwrap_or(defaults.large_table_threshold),
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            classify_sample_rows: self
                .classify_sample_rows
                .unwrap_or(defaults.classify_sample_rows),
            column_batch_size: self.column_batch_size.unwrap_or(defaults.column_batch_size),
            workers: self.workers.unwrap_or(defaults.workers),
            parallel_columns: self.parallel_columns.unwrap_or(defaults.parallel_columns),
            max_sample_size: self.max_sample_size.unwrap_or(defaults.max_sample_size),
            retry_attempts: self.retry_attempts.unwrap_or(defaults.retry_attempts),
            retry_base_delay: self.retry_base_delay.unwrap_or(defaults.retry_base_delay),
            soft_timeout: self.soft_timeout.unwrap_or(defaults.soft_timeout),
            hard_timeout: self.hard_timeout.unwrap_or(defaults.hard_timeout),
            queue_capacity: self.queue_capacity.unwrap_or(defaults.queue_capacity),
            poll_timeout: self.poll_timeout.unwrap_or(defaults.poll_timeout),
            sample_seed: self.sample_seed.or(defaults.sample_seed),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::builder()
            .chunk_size(1_000)
            .workers(4)
            .sample_seed(42)
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 1_000);
        assert_eq!(config.workers, 4);
        assert_eq!(config.sample_seed, Some(42));
        assert_eq!(config.retry_attempts, 2);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = EngineConfig::builder().workers(0).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::ZeroField("workers"))
        ));
    }

    #[test]
    fn test_timeout_order_enforced() {
        let result = EngineConfig::builder()
            .soft_timeout(Duration::from_secs(120))
            .hard_timeout(Duration::from_secs(60))
            .build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::TimeoutOrder { .. })
        ));
    }
}
