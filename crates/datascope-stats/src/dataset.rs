//! Dataset statistics calculator.
//!
//! Cross-column aggregates over the numeric columns of a table: Pearson
//! correlation matrix with p-values, parallel-coordinates data, violin
//! payloads, a heatmap reshape, and a scatter-matrix sample. All five
//! payloads derive from one shared row sample for cross-consistency, while
//! per-column ranges and summary statistics come from the full columns.

use polars::prelude::*;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::kind::{classify_series, ColumnKind};
use crate::numeric::{normal_sf, percentile};
use crate::sample::sample_rows;
use crate::sanitize::{empty_object, finite, finite_round4, sanitize_value};
use crate::types::{DatasetStatistics, StatsOptions};

/// One selected numeric column: its name, full-column values, and the
/// values restricted to the shared sample.
struct NumericColumn {
    name: String,
    full: Vec<Option<f64>>,
    sampled: Vec<Option<f64>>,
}

/// Compute cross-column statistics for a table.
pub fn compute_dataset_stats(df: &DataFrame, opts: &StatsOptions) -> Result<DatasetStatistics> {
    let numeric_names = select_numeric_columns(df, opts)?;
    if numeric_names.len() < 2 {
        debug!(
            "Fewer than 2 numeric columns ({}); dataset statistics empty",
            numeric_names.len()
        );
        return Ok(DatasetStatistics::empty());
    }

    // One shared sample drives all five payloads.
    let sampled_df = sample_rows(df, opts.dataset_sample_size, opts.seed)?;

    let mut columns = Vec::with_capacity(numeric_names.len());
    for name in &numeric_names {
        columns.push(NumericColumn {
            name: name.clone(),
            full: column_values(df, name)?,
            sampled: column_values(&sampled_df, name)?,
        });
    }

    let (corr, p_values) = correlation_with_p_values(&columns);

    let mut stats = DatasetStatistics {
        correlation_matrix: corr.clone(),
        parallel_coords: guarded("parallel_coords", || parallel_coords(&columns, opts)),
        violin_data: guarded("violin_data", || violin_data(&columns, opts)),
        heatmap_data: guarded("heatmap_data", || {
            heatmap_data(&columns, &corr, &p_values)
        }),
        scatter_matrix: guarded("scatter_matrix", || scatter_matrix(&columns, opts)),
    };
    sanitize_value(&mut stats.correlation_matrix);
    sanitize_value(&mut stats.parallel_coords);
    sanitize_value(&mut stats.violin_data);
    sanitize_value(&mut stats.heatmap_data);
    sanitize_value(&mut stats.scatter_matrix);
    Ok(stats)
}

/// Run one sub-payload builder, absorbing any failure into `{}`.
fn guarded<F>(label: &str, f: F) -> Value
where
    F: FnOnce() -> Result<Value>,
{
    match f() {
        Ok(v) => v,
        Err(e) => {
            warn!("Dataset sub-computation '{}' failed: {}", label, e);
            empty_object()
        }
    }
}

/// Numeric columns in original order, capped at `max_dataset_columns` by
/// variance (descending, ties by original column order).
fn select_numeric_columns(df: &DataFrame, opts: &StatsOptions) -> Result<Vec<String>> {
    let mut numeric: Vec<(usize, String)> = Vec::new();
    for (idx, col) in df.get_columns().iter().enumerate() {
        let series = col.as_materialized_series();
        if classify_series(series) == ColumnKind::Numeric {
            numeric.push((idx, series.name().to_string()));
        }
    }
    if numeric.len() <= opts.max_dataset_columns {
        return Ok(numeric.into_iter().map(|(_, n)| n).collect());
    }

    let mut ranked: Vec<(usize, String, f64)> = Vec::with_capacity(numeric.len());
    for (idx, name) in numeric {
        let values = column_values(df, &name)?;
        ranked.push((idx, name, variance(&values)));
    }
    // Highest variance first; equal variances keep original column order.
    ranked.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked.truncate(opts.max_dataset_columns);
    ranked.sort_by_key(|(idx, _, _)| *idx);
    Ok(ranked.into_iter().map(|(_, n, _)| n).collect())
}

/// Read one column as `Option<f64>` values (nulls and non-finite → None).
fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn variance(values: &[Option<f64>]) -> f64 {
    let clean: Vec<f64> = values.iter().flatten().copied().collect();
    if clean.len() < 2 {
        return 0.0;
    }
    let mean = clean.iter().sum::<f64>() / clean.len() as f64;
    clean.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (clean.len() - 1) as f64
}

/// Pearson correlation over pairwise-complete observations of the sample.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<(f64, usize)> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / nf;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt()), n))
}

/// Two-sided p-value via the Fisher z transform normal approximation.
///
/// Undefined inputs (n ≤ 3, degenerate correlation) fall back to 1.0 — the
/// conservative "no significant evidence" default.
fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n <= 3 || !r.is_finite() {
        return 1.0;
    }
    if r.abs() >= 1.0 - 1e-12 {
        return 0.0;
    }
    let z = r.atanh() * ((n - 3) as f64).sqrt();
    let p = 2.0 * normal_sf(z.abs());
    p.clamp(0.0, 1.0)
}

/// Build the correlation matrix (column → column → r, 4 dp, NaN → 0) and
/// the companion p-value map over ordered pairs.
fn correlation_with_p_values(columns: &[NumericColumn]) -> (Value, Value) {
    let mut matrix = Map::new();
    let mut p_values = Map::new();

    for a in columns {
        let mut row = Map::new();
        for b in columns {
            let key = format!("{}|{}", a.name, b.name);
            if a.name == b.name {
                row.insert(b.name.clone(), json!(1.0));
                p_values.insert(key, json!(0.0));
                continue;
            }
            // Columns with too few observations get r=0, p=1.
            let non_null_a = a.sampled.iter().flatten().count();
            let non_null_b = b.sampled.iter().flatten().count();
            if non_null_a <= 2 || non_null_b <= 2 {
                row.insert(b.name.clone(), json!(0.0));
                p_values.insert(key, json!(1.0));
                continue;
            }
            match pearson(&a.sampled, &b.sampled) {
                Some((r, n)) if r.is_finite() => {
                    row.insert(b.name.clone(), finite_round4(r));
                    p_values.insert(key, finite(correlation_p_value(r, n)));
                }
                _ => {
                    row.insert(b.name.clone(), json!(0.0));
                    p_values.insert(key, json!(1.0));
                }
            }
        }
        matrix.insert(a.name.clone(), Value::Object(row));
    }
    (Value::Object(matrix), Value::Object(p_values))
}

/// Parallel-coordinates payload: min-max normalized sample rows plus the
/// true full-column ranges.
fn parallel_coords(columns: &[NumericColumn], opts: &StatsOptions) -> Result<Value> {
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();

    let mut ranges = Map::new();
    let mut bounds = Vec::with_capacity(columns.len());
    for col in columns {
        let clean: Vec<f64> = col.full.iter().flatten().copied().collect();
        let (min, max) = match min_max(&clean) {
            Some(b) => b,
            None => (f64::NAN, f64::NAN),
        };
        ranges.insert(col.name.clone(), json!([finite(min), finite(max)]));
        bounds.push((min, max));
    }

    let row_count = columns.iter().map(|c| c.sampled.len()).min().unwrap_or(0);
    let rows = row_count.min(opts.viz_row_cap);
    let mut data = Vec::with_capacity(rows);
    for i in 0..rows {
        let mut row = Vec::with_capacity(columns.len());
        for (col, (min, max)) in columns.iter().zip(bounds.iter()) {
            let v = match col.sampled[i] {
                Some(v) => v,
                None => {
                    row.push(Value::Null);
                    continue;
                }
            };
            // Zero-range columns stay at 0 rather than dividing by zero.
            let norm = if max > min { (v - min) / (max - min) } else { 0.0 };
            row.push(finite(norm));
        }
        data.push(Value::Array(row));
    }

    Ok(json!({
        "columns": names,
        "data": data,
        "ranges": ranges,
    }))
}

/// Violin payload: capped value lists per column plus full-column summary
/// statistics.
fn violin_data(columns: &[NumericColumn], opts: &StatsOptions) -> Result<Value> {
    let mut out = Map::new();
    for col in columns {
        let clean: Vec<f64> = col.full.iter().flatten().copied().collect();
        if clean.is_empty() {
            out.insert(col.name.clone(), empty_object());
            continue;
        }
        let mut sorted = clean.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let values = crate::sample::sample_values(&clean, opts.viz_row_cap, opts.seed);
        let mean = clean.iter().sum::<f64>() / clean.len() as f64;
        out.insert(
            col.name.clone(),
            json!({
                "values": values.iter().map(|v| finite(*v)).collect::<Vec<_>>(),
                "stats": {
                    "min": finite(sorted[0]),
                    "max": finite(sorted[sorted.len() - 1]),
                    "mean": finite(mean),
                    "median": finite(percentile(&sorted, 0.5)),
                    "q1": finite(percentile(&sorted, 0.25)),
                    "q3": finite(percentile(&sorted, 0.75)),
                },
            }),
        );
    }
    Ok(Value::Object(out))
}

/// Heatmap payload: the correlation matrix reshaped for plotting.
fn heatmap_data(columns: &[NumericColumn], corr: &Value, p_values: &Value) -> Result<Value> {
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    let mut z = Vec::with_capacity(names.len());
    for row_name in &names {
        let row: Vec<Value> = names
            .iter()
            .map(|col_name| corr[*row_name][*col_name].clone())
            .collect();
        z.push(Value::Array(row));
    }
    Ok(json!({
        "z": z,
        "x": names,
        "y": names,
        "p_values": p_values,
    }))
}

/// Scatter-matrix payload: a bounded row sample as records, nulls filled
/// with 0.
fn scatter_matrix(columns: &[NumericColumn], opts: &StatsOptions) -> Result<Value> {
    let row_count = columns.iter().map(|c| c.sampled.len()).min().unwrap_or(0);
    let rows = row_count.min(opts.scatter_row_cap);
    let mut records = Vec::with_capacity(rows);
    for i in 0..rows {
        let mut record = Map::new();
        for col in columns {
            record.insert(col.name.clone(), finite(col.sampled[i].unwrap_or(0.0)));
        }
        records.push(Value::Object(record));
    }
    Ok(json!({ "data": records }))
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter();
    let first = *iter.next()?;
    let mut min = first;
    let mut max = first;
    for &v in iter {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    Some((min, max))
}
