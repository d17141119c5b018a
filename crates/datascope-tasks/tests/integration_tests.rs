//! End-to-end tests for the statistics task engine.
//!
//! These drive the full submit → queue → coordinator → store path through
//! the [`StatsEngine`] facade, over both CSV fixtures and in-memory tables.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use datascope_stats::sanitize::all_finite;
use datascope_tasks::{
    CsvDirProvider, EngineConfig, MemoryProvider, MemoryStore, StatsEngine, TaskRecord, TaskStatus,
};
use polars::prelude::*;
use serde_json::json;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fast_config() -> EngineConfig {
    EngineConfig::builder()
        .poll_timeout(Duration::from_millis(20))
        .retry_base_delay(Duration::from_millis(1))
        .sample_seed(7)
        .build()
        .unwrap()
}

fn csv_engine() -> StatsEngine {
    StatsEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(CsvDirProvider::new(fixtures_path())),
        fast_config(),
    )
    .unwrap()
}

fn memory_engine(tables: Vec<(&str, DataFrame)>) -> StatsEngine {
    let provider = Arc::new(MemoryProvider::new());
    for (name, df) in tables {
        provider.register(name, df);
    }
    StatsEngine::new(Arc::new(MemoryStore::new()), provider, fast_config()).unwrap()
}

fn wait_terminal(engine: &StatsEngine, task_id: &str) -> TaskRecord {
    let deadline = Instant::now() + Duration::from_secs(60);
    loop {
        let record = engine.get_status(task_id).unwrap();
        if record.status.is_terminal() {
            return record;
        }
        assert!(
            Instant::now() < deadline,
            "task {task_id} never reached a terminal state"
        );
        thread::sleep(Duration::from_millis(10));
    }
}

// ============================================================================
// Full Engine Tests over the CSV Fixture
// ============================================================================

#[test]
fn test_analyze_csv_end_to_end() {
    let engine = csv_engine();
    let task_id = engine.submit("products", "products.csv").unwrap();

    let record = wait_terminal(&engine, &task_id);
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.progress, 1.0);
    assert!(record.completed_at.is_some());

    for column in ["id", "price", "quantity", "category"] {
        let stats = engine
            .get_column_stats("products", column)
            .unwrap()
            .unwrap_or_else(|| panic!("no stats for column {column}"));
        assert!(all_finite(&stats.basic_stats), "non-finite in {column}");
        assert!(all_finite(&stats.distribution));
        assert!(all_finite(&stats.shape_stats));
        assert!(all_finite(&stats.outlier_stats));
    }

    let dataset = engine.get_dataset_stats("products").unwrap().unwrap();
    assert!(all_finite(&dataset.correlation_matrix));
    assert!(all_finite(&dataset.heatmap_data));
    engine.shutdown();
}

#[test]
fn test_csv_column_stats_match_known_values() {
    let engine = csv_engine();
    let task_id = engine.submit("products", "products.csv").unwrap();
    wait_terminal(&engine, &task_id);

    // The fixture has 40 rows; every 13th price is blank (rows 13, 26, 39).
    let price = engine.get_column_stats("products", "price").unwrap().unwrap();
    assert_eq!(price.basic_stats["count"], json!(37));
    assert_eq!(price.basic_stats["missing_count"], json!(3));

    let category = engine
        .get_column_stats("products", "category")
        .unwrap()
        .unwrap();
    assert_eq!(category.basic_stats["unique_count"], json!(3));
    assert_eq!(category.basic_stats["missing_count"], json!(0));
    engine.shutdown();
}

#[test]
fn test_nonexistent_table_fails_in_one_run() {
    let engine = csv_engine();
    let task_id = engine.submit("ghost", "no_such_table.csv").unwrap();

    let record = wait_terminal(&engine, &task_id);
    assert_eq!(record.status, TaskStatus::Failed);
    assert!(record.message.contains("not found"));
    assert!(record.completed_at.is_none());
    // No partial results were written.
    assert!(engine.get_dataset_stats("ghost").unwrap().is_none());
    engine.shutdown();
}

#[test]
fn test_progress_is_monotone_under_polling() {
    let engine = csv_engine();
    let task_id = engine.submit("products", "products.csv").unwrap();

    let mut observed = Vec::new();
    loop {
        let record = engine.get_status(&task_id).unwrap();
        observed.push(record.progress);
        if record.status.is_terminal() {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }

    for pair in observed.windows(2) {
        assert!(pair[1] >= pair[0], "progress regressed: {observed:?}");
    }
    assert_eq!(*observed.last().unwrap(), 1.0);
    engine.shutdown();
}

// ============================================================================
// Scenario Tests over In-Memory Tables
// ============================================================================

#[test]
fn test_categorical_nulls_excluded_from_unique_count() {
    let values: Vec<Option<&str>> = vec![
        Some("A"),
        Some("A"),
        Some("A"),
        Some("B"),
        Some("B"),
        Some("C"),
        None,
    ];
    let df =
        DataFrame::new(vec![Series::new("grade".into(), values).into()]).unwrap();
    let engine = memory_engine(vec![("grades", df)]);

    let task_id = engine.submit("tbl", "grades").unwrap();
    assert_eq!(wait_terminal(&engine, &task_id).status, TaskStatus::Completed);

    let stats = engine.get_column_stats("tbl", "grade").unwrap().unwrap();
    assert_eq!(stats.basic_stats["unique_count"], json!(3));
    assert_eq!(stats.basic_stats["top"], json!("A"));
    assert_eq!(stats.basic_stats["top_count"], json!(3));
    assert_eq!(stats.distribution["null"], json!(1));
    engine.shutdown();
}

#[test]
fn test_single_numeric_column_yields_empty_dataset_payloads() {
    let df = DataFrame::new(vec![
        Series::new("x".into(), &[1.0f64, 2.0, 3.0, 4.0]).into(),
    ])
    .unwrap();
    let engine = memory_engine(vec![("solo", df)]);

    let task_id = engine.submit("tbl", "solo").unwrap();
    assert_eq!(wait_terminal(&engine, &task_id).status, TaskStatus::Completed);

    let dataset = engine.get_dataset_stats("tbl").unwrap().unwrap();
    for payload in [
        &dataset.correlation_matrix,
        &dataset.parallel_coords,
        &dataset.violin_data,
        &dataset.heatmap_data,
        &dataset.scatter_matrix,
    ] {
        assert!(payload.as_object().unwrap().is_empty());
    }
    engine.shutdown();
}

#[test]
fn test_all_missing_column_does_not_fail_task() {
    let df = DataFrame::new(vec![
        Series::new("x".into(), &[1.0f64, 2.0, 3.0]).into(),
        Series::new("empty".into(), &[None::<f64>, None, None]).into(),
    ])
    .unwrap();
    let engine = memory_engine(vec![("sparse", df)]);

    let task_id = engine.submit("tbl", "sparse").unwrap();
    assert_eq!(wait_terminal(&engine, &task_id).status, TaskStatus::Completed);

    let stats = engine.get_column_stats("tbl", "empty").unwrap().unwrap();
    assert_eq!(stats.basic_stats["missing_percentage"], json!(100.0));
    assert!(stats.distribution.as_object().unwrap().is_empty());
    assert!(stats.shape_stats.as_object().unwrap().is_empty());
    assert!(stats.outlier_stats.as_object().unwrap().is_empty());
    engine.shutdown();
}

#[test]
fn test_perfect_correlation_scenario() {
    let df = DataFrame::new(vec![
        Series::new("x".into(), &[1.0f64, 2.0, 3.0]).into(),
        Series::new("y".into(), &[2.0f64, 4.0, 6.0]).into(),
    ])
    .unwrap();
    let engine = memory_engine(vec![("pairs", df)]);

    let task_id = engine.submit("tbl", "pairs").unwrap();
    assert_eq!(wait_terminal(&engine, &task_id).status, TaskStatus::Completed);

    let dataset = engine.get_dataset_stats("tbl").unwrap().unwrap();
    assert_eq!(dataset.correlation_matrix["x"]["y"], json!(1.0));
    assert_eq!(dataset.correlation_matrix["y"]["x"], json!(1.0));
    engine.shutdown();
}

#[test]
fn test_rerun_is_idempotent_for_non_sampled_fields() {
    let make_df = || {
        DataFrame::new(vec![
            Series::new("x".into(), &[10.0f64, 20.0, 30.0, 40.0, 50.0]).into(),
            Series::new("tag".into(), &["a", "b", "a", "c", "a"]).into(),
        ])
        .unwrap()
    };
    let engine = memory_engine(vec![("stable", make_df())]);

    let first_task = engine.submit("tbl", "stable").unwrap();
    wait_terminal(&engine, &first_task);
    let first = engine.get_column_stats("tbl", "x").unwrap().unwrap();

    let second_task = engine.submit("tbl", "stable").unwrap();
    wait_terminal(&engine, &second_task);
    let second = engine.get_column_stats("tbl", "x").unwrap().unwrap();

    assert_eq!(first.basic_stats, second.basic_stats);
    assert_eq!(first.outlier_stats, second.outlier_stats);
    engine.shutdown();
}
