//! Statistics record types and calculator options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::ColumnKind;
use crate::sanitize::empty_object;

/// Computed statistics for a single column.
///
/// The four payloads are JSON objects whose shape depends on `data_type`;
/// a payload that could not be computed (or does not apply to the kind) is
/// the empty object. Records are keyed by `(table_id, column_name)` in the
/// store and replaced wholesale on recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub data_type: ColumnKind,
    pub basic_stats: Value,
    pub distribution: Value,
    pub shape_stats: Value,
    pub outlier_stats: Value,
}

impl ColumnStatistics {
    /// A record with the given kind and all payloads empty.
    pub fn empty(kind: ColumnKind) -> Self {
        Self {
            data_type: kind,
            basic_stats: empty_object(),
            distribution: empty_object(),
            shape_stats: empty_object(),
            outlier_stats: empty_object(),
        }
    }
}

/// Computed cross-column statistics for one table.
///
/// Each payload is an empty object when the table has fewer than two
/// numeric columns — a valid "nothing to correlate" result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub correlation_matrix: Value,
    pub parallel_coords: Value,
    pub violin_data: Value,
    pub heatmap_data: Value,
    pub scatter_matrix: Value,
}

impl DatasetStatistics {
    /// All five payloads empty.
    pub fn empty() -> Self {
        Self {
            correlation_matrix: empty_object(),
            parallel_coords: empty_object(),
            violin_data: empty_object(),
            heatmap_data: empty_object(),
            scatter_matrix: empty_object(),
        }
    }
}

/// Caps and sample sizes for the calculators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsOptions {
    /// Categorical columns longer than this are value-counted from a sample.
    pub categorical_sample_threshold: usize,
    /// Sample size for categorical value counts on large columns.
    pub categorical_sample_size: usize,
    /// Most-frequent categories retained in the distribution payload.
    pub max_categories: usize,
    /// QQ-plot input longer than this is sampled down.
    pub qq_threshold: usize,
    /// QQ-plot sample size.
    pub qq_sample_size: usize,
    /// Skewness/kurtosis input longer than this is sampled down.
    pub moment_threshold: usize,
    /// Skewness/kurtosis sample size.
    pub moment_sample_size: usize,
    /// Example outlier values retained per column.
    pub max_outlier_examples: usize,
    /// Numeric columns retained for dataset statistics (highest variance).
    pub max_dataset_columns: usize,
    /// Shared row sample size for dataset statistics.
    pub dataset_sample_size: usize,
    /// Row cap for parallel-coordinates and violin payloads.
    pub viz_row_cap: usize,
    /// Row cap for the scatter-matrix payload.
    pub scatter_row_cap: usize,
    /// Seed for reproducible sampling; `None` uses entropy.
    pub seed: Option<u64>,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            categorical_sample_threshold: 100_000,
            categorical_sample_size: 50_000,
            max_categories: 1_000,
            qq_threshold: 10_000,
            qq_sample_size: 5_000,
            moment_threshold: 50_000,
            moment_sample_size: 10_000,
            max_outlier_examples: 100,
            max_dataset_columns: 15,
            dataset_sample_size: 5_000,
            viz_row_cap: 1_000,
            scatter_row_cap: 500,
            seed: None,
        }
    }
}
