//! Column statistics calculator.
//!
//! `compute_column_stats` is a pure function from one column (plus its
//! pre-computed kind) to a [`ColumnStatistics`] record. Sub-computations
//! are individually guarded: a degenerate histogram or entropy never fails
//! the column, it just leaves that sub-payload empty.

use polars::prelude::*;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::Result;
use crate::kind::ColumnKind;
use crate::numeric;
use crate::sample::sample_series;
use crate::sanitize::{empty_object, finite, finite_opt, sanitize_value};
use crate::types::{ColumnStatistics, StatsOptions};

/// Compute the statistics record for a single column.
pub fn compute_column_stats(
    series: &Series,
    kind: ColumnKind,
    opts: &StatsOptions,
) -> Result<ColumnStatistics> {
    let mut stats = match kind {
        ColumnKind::Numeric => numeric_stats(series, opts)?,
        ColumnKind::Categorical => categorical_stats(series, opts)?,
        ColumnKind::Other => other_stats(series),
    };
    sanitize_value(&mut stats.basic_stats);
    sanitize_value(&mut stats.distribution);
    sanitize_value(&mut stats.shape_stats);
    sanitize_value(&mut stats.outlier_stats);
    Ok(stats)
}

/// Extract the finite values of a numeric column.
///
/// Nulls and non-finite values both count as missing: neither can appear
/// in a stored payload, and NaN would poison every order statistic.
fn clean_values(series: &Series) -> Result<Vec<f64>> {
    let float_series = series.cast(&DataType::Float64)?;
    let ca = float_series.f64()?;
    Ok(ca.into_iter().flatten().filter(|v| v.is_finite()).collect())
}

fn numeric_stats(series: &Series, opts: &StatsOptions) -> Result<ColumnStatistics> {
    let total = series.len();
    let clean = clean_values(series)?;
    let missing = total - clean.len();

    if clean.is_empty() {
        return Ok(ColumnStatistics {
            data_type: ColumnKind::Numeric,
            basic_stats: json!({
                "missing_count": missing,
                "missing_percentage": 100.0,
            }),
            distribution: empty_object(),
            shape_stats: empty_object(),
            outlier_stats: empty_object(),
        });
    }

    let mut sorted = clean.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = clean.len();
    let mean = clean.iter().sum::<f64>() / count as f64;
    let median = numeric::percentile(&sorted, 0.5);
    let missing_percentage = if total > 0 {
        missing as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let basic_stats = json!({
        "min": finite(sorted[0]),
        "max": finite(sorted[count - 1]),
        "mean": finite(mean),
        "median": finite(median),
        "mode": finite_opt(numeric::mode(&clean)),
        "count": count,
        "missing_count": missing,
        "missing_percentage": finite(missing_percentage),
    });

    let distribution = json!({
        "histogram": numeric::histogram(&sorted),
        "boxplot": numeric::boxplot(&sorted),
        "qq_plot": numeric::qq_plot(&clean, opts),
    });

    Ok(ColumnStatistics {
        data_type: ColumnKind::Numeric,
        basic_stats,
        distribution,
        shape_stats: numeric::shape_moments(&clean, opts),
        outlier_stats: numeric::outlier_stats(&clean, &sorted, opts),
    })
}

/// Stringify one cell for use as a distribution key. Nulls map to the
/// literal `"null"` key.
fn value_key(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => "null".to_string(),
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => format!("{}", other),
    }
}

fn categorical_stats(series: &Series, opts: &StatsOptions) -> Result<ColumnStatistics> {
    let total = series.len();
    let missing = series.null_count();
    let missing_percentage = if total > 0 {
        missing as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    // Value counts, from a bounded sample when the column is very large.
    let counted = if total > opts.categorical_sample_threshold {
        sample_series(series, opts.categorical_sample_size, opts.seed)?
    } else {
        series.clone()
    };

    // Encounter-ordered counting so ties rank deterministically.
    let mut counts: Vec<(String, u64)> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for i in 0..counted.len() {
        let key = match counted.get(i) {
            Ok(av) => value_key(&av),
            Err(e) => {
                warn!("Skipping unreadable value in '{}': {}", series.name(), e);
                continue;
            }
        };
        match index.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    // Nulls are excluded from unique_count; they are reported through
    // missing_count and the "null" distribution key only. Counted before
    // the category cap: the cap bounds the retained distribution, not the
    // cardinality statistic.
    let unique_count = index.keys().filter(|k| *k != "null").count();

    // Rank by count descending, keep the most frequent categories.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(opts.max_categories);
    let (top, top_count) = counts
        .iter()
        .find(|(k, _)| k != "null")
        .map(|(k, c)| (Value::String(k.clone()), json!(*c)))
        .unwrap_or((Value::Null, Value::Null));

    let mut distribution = Map::new();
    for (key, count) in &counts {
        distribution.insert(key.clone(), json!(*count));
    }

    let shape_stats = json!({ "entropy": finite(entropy(&counts)) });

    Ok(ColumnStatistics {
        data_type: ColumnKind::Categorical,
        basic_stats: json!({
            "unique_count": unique_count,
            "missing_count": missing,
            "missing_percentage": finite(missing_percentage),
            "top": top,
            "top_count": top_count,
        }),
        distribution: Value::Object(distribution),
        shape_stats,
        outlier_stats: empty_object(),
    })
}

/// Shannon entropy (natural log) of a category frequency distribution.
fn entropy(counts: &[(String, u64)]) -> f64 {
    if counts.len() <= 1 {
        return 0.0;
    }
    let total: u64 = counts.iter().map(|(_, c)| c).sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|(_, c)| *c > 0)
        .map(|(_, c)| {
            let p = *c as f64 / total as f64;
            -p * p.ln()
        })
        .sum()
}

fn other_stats(series: &Series) -> ColumnStatistics {
    let total = series.len();
    let missing = series.null_count();
    let missing_percentage = if total > 0 {
        missing as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    ColumnStatistics {
        data_type: ColumnKind::Other,
        basic_stats: json!({
            "missing_count": missing,
            "missing_percentage": finite(missing_percentage),
        }),
        distribution: empty_object(),
        shape_stats: empty_object(),
        outlier_stats: empty_object(),
    }
}
