//! Numeric sub-computations for column statistics.
//!
//! Every function here operates on the cleaned (missing-free) values of a
//! single column and produces one sub-payload. Degenerate input (empty
//! slice, zero spread) yields an empty or defaulted payload rather than an
//! error, so one bad sub-computation never takes the whole column down.

use serde_json::{json, Value};

use crate::sample::sample_values;
use crate::sanitize::{empty_object, finite};
use crate::types::StatsOptions;

/// Percentile by linear interpolation over an ascending-sorted slice.
///
/// `p` is in `[0, 1]`. Returns NaN for an empty slice; callers sanitize.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Mode: the most frequent value, ties broken by first encounter order.
pub fn mode(values: &[f64]) -> Option<f64> {
    use std::collections::HashMap;

    let mut counts: HashMap<u64, (usize, usize)> = HashMap::new();
    for (i, v) in values.iter().enumerate() {
        let entry = counts.entry(v.to_bits()).or_insert((0, i));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(bits, _)| f64::from_bits(bits))
}

/// Histogram with bin count scaling with volume: clamp(n/1000, 10, 50).
pub fn histogram(sorted: &[f64]) -> Value {
    if sorted.is_empty() {
        return empty_object();
    }
    let n = sorted.len();
    let bins = (n / 1_000).clamp(10, 50);
    let min = sorted[0];
    let max = sorted[n - 1];

    if !min.is_finite() || !max.is_finite() {
        return empty_object();
    }
    if min == max {
        // Degenerate spread: everything lands in one bin.
        return json!({
            "bin_edges": [finite(min), finite(max)],
            "counts": [n],
        });
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in sorted {
        let mut idx = ((v - min) / width) as usize;
        if idx >= bins {
            idx = bins - 1;
        }
        counts[idx] += 1;
    }
    let edges: Vec<Value> = (0..=bins)
        .map(|i| finite(min + width * i as f64))
        .collect();
    json!({ "bin_edges": edges, "counts": counts })
}

/// Boxplot summary with whiskers clipped to the observed range.
pub fn boxplot(sorted: &[f64]) -> Value {
    if sorted.is_empty() {
        return empty_object();
    }
    let q1 = percentile(sorted, 0.25);
    let q3 = percentile(sorted, 0.75);
    let median = percentile(sorted, 0.5);
    let iqr = q3 - q1;
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    json!({
        "q1": finite(q1),
        "q3": finite(q3),
        "median": finite(median),
        "whisker_low": finite(min.max(q1 - 1.5 * iqr)),
        "whisker_high": finite(max.min(q3 + 1.5 * iqr)),
    })
}

/// QQ-plot sample: ranked values paired with standard-normal quantiles.
///
/// Inputs beyond `qq_threshold` points are sampled down to `qq_sample_size`.
/// Pairs whose theoretical quantile is non-finite are discarded.
pub fn qq_plot(values: &[f64], opts: &StatsOptions) -> Value {
    if values.is_empty() {
        return empty_object();
    }
    let mut sample = if values.len() > opts.qq_threshold {
        sample_values(values, opts.qq_sample_size, opts.seed)
    } else {
        values.to_vec()
    };
    sample.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sample.len();
    let mut sample_q = Vec::with_capacity(n);
    let mut theoretical_q = Vec::with_capacity(n);
    for (i, v) in sample.iter().enumerate() {
        let q = normal_quantile((i as f64 + 0.5) / n as f64);
        if q.is_finite() {
            sample_q.push(finite(*v));
            theoretical_q.push(finite(q));
        }
    }
    json!({
        "sample_quantiles": sample_q,
        "theoretical_quantiles": theoretical_q,
    })
}

/// Skewness and excess kurtosis, sampled down beyond `moment_threshold`.
pub fn shape_moments(values: &[f64], opts: &StatsOptions) -> Value {
    if values.is_empty() {
        return empty_object();
    }
    let sample = if values.len() > opts.moment_threshold {
        sample_values(values, opts.moment_sample_size, opts.seed)
    } else {
        values.to_vec()
    };

    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let m2 = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if m2 == 0.0 {
        return json!({ "skewness": 0.0, "kurtosis": 0.0 });
    }
    let m3 = sample.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    let m4 = sample.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / n;
    json!({
        "skewness": finite(m3 / m2.powf(1.5)),
        "kurtosis": finite(m4 / (m2 * m2) - 3.0),
    })
}

/// IQR outliers: values outside `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`.
///
/// Examples are retained in encounter order, capped at
/// `max_outlier_examples` — not necessarily the most extreme values.
pub fn outlier_stats(values: &[f64], sorted: &[f64], opts: &StatsOptions) -> Value {
    if sorted.is_empty() {
        return empty_object();
    }
    let q1 = percentile(sorted, 0.25);
    let q3 = percentile(sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let mut count = 0usize;
    let mut examples = Vec::new();
    for &v in values {
        if v < lower || v > upper {
            count += 1;
            if examples.len() < opts.max_outlier_examples {
                examples.push(finite(v));
            }
        }
    }
    json!({
        "count": count,
        "percentage": finite(count as f64 / values.len() as f64 * 100.0),
        "lower_bound": finite(lower),
        "upper_bound": finite(upper),
        "values": examples,
    })
}

/// Inverse CDF of the standard normal distribution.
///
/// Acklam's rational approximation; relative error below 1.15e-9 over the
/// open unit interval. Returns NaN outside `(0, 1)`.
pub fn normal_quantile(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) || p == 0.0 || p == 1.0 {
        return f64::NAN;
    }

    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// Upper tail probability of the standard normal distribution.
///
/// Abramowitz & Stegun 7.1.26 (max absolute error 1.5e-7).
pub fn normal_sf(z: f64) -> f64 {
    let x = z / std::f64::consts::SQRT_2;
    let erfc = {
        let t = 1.0 / (1.0 + 0.3275911 * x.abs());
        let poly = t
            * (0.254829592
                + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
        let e = poly * (-x * x).exp();
        if x >= 0.0 { e } else { 2.0 - e }
    };
    0.5 * erfc
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn opts() -> StatsOptions {
        StatsOptions {
            seed: Some(42),
            ..StatsOptions::default()
        }
    }

    // ==================== percentile tests ====================

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.5), 3.0);
        assert_eq!(percentile(&sorted, 0.25), 2.0);
        assert_eq!(percentile(&sorted, 0.75), 4.0);
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 1.0), 5.0);
    }

    #[test]
    fn test_percentile_between_points() {
        let sorted = [1.0, 2.0];
        assert_eq!(percentile(&sorted, 0.5), 1.5);
    }

    #[test]
    fn test_percentile_empty_is_nan() {
        assert!(percentile(&[], 0.5).is_nan());
    }

    // ==================== mode tests ====================

    #[test]
    fn test_mode_basic() {
        assert_eq!(mode(&[1.0, 2.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_mode_tie_takes_first_encountered() {
        assert_eq!(mode(&[3.0, 3.0, 1.0, 1.0]), Some(3.0));
    }

    #[test]
    fn test_mode_empty() {
        assert_eq!(mode(&[]), None);
    }

    // ==================== histogram tests ====================

    #[test]
    fn test_histogram_bin_count_floor() {
        let sorted: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let h = histogram(&sorted);
        // 100 values -> 100/1000 = 0 -> clamped to 10 bins.
        assert_eq!(h["counts"].as_array().unwrap().len(), 10);
        assert_eq!(h["bin_edges"].as_array().unwrap().len(), 11);
    }

    #[test]
    fn test_histogram_counts_total() {
        let sorted: Vec<f64> = (0..500).map(|i| i as f64).collect();
        let h = histogram(&sorted);
        let total: u64 = h["counts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_u64().unwrap())
            .sum();
        assert_eq!(total, 500);
    }

    #[test]
    fn test_histogram_constant_column() {
        let h = histogram(&[5.0, 5.0, 5.0]);
        assert_eq!(h["counts"], serde_json::json!([3]));
    }

    #[test]
    fn test_histogram_empty() {
        assert!(histogram(&[]).as_object().unwrap().is_empty());
    }

    // ==================== boxplot tests ====================

    #[test]
    fn test_boxplot_whiskers_clipped_to_range() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = boxplot(&sorted);
        // Q1=2, Q3=4, IQR=2: raw whiskers would be -1 and 7, clipped to data.
        assert_eq!(b["whisker_low"], serde_json::json!(1.0));
        assert_eq!(b["whisker_high"], serde_json::json!(5.0));
        assert_eq!(b["median"], serde_json::json!(3.0));
    }

    // ==================== qq plot tests ====================

    #[test]
    fn test_qq_plot_pairs_match_and_are_finite() {
        let values: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let q = qq_plot(&values, &opts());
        let s = q["sample_quantiles"].as_array().unwrap();
        let t = q["theoretical_quantiles"].as_array().unwrap();
        assert_eq!(s.len(), t.len());
        assert_eq!(s.len(), 200);
        assert!(t.iter().all(|v| v.as_f64().unwrap().is_finite()));
    }

    #[test]
    fn test_qq_plot_large_input_sampled() {
        let values: Vec<f64> = (0..20_000).map(|i| i as f64).collect();
        let q = qq_plot(&values, &opts());
        assert_eq!(q["sample_quantiles"].as_array().unwrap().len(), 5_000);
    }

    // ==================== moment tests ====================

    #[test]
    fn test_moments_symmetric_distribution() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = shape_moments(&values, &opts());
        assert!(m["skewness"].as_f64().unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_moments_right_skew_positive() {
        let values = [1.0, 1.0, 1.0, 1.0, 10.0];
        let m = shape_moments(&values, &opts());
        assert!(m["skewness"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_moments_constant_column() {
        let m = shape_moments(&[5.0, 5.0, 5.0], &opts());
        assert_eq!(m["skewness"], serde_json::json!(0.0));
        assert_eq!(m["kurtosis"], serde_json::json!(0.0));
    }

    // ==================== outlier tests ====================

    #[test]
    fn test_outliers_detected() {
        let mut values: Vec<f64> = (1..=9).map(|i| i as f64).collect();
        values.push(100.0);
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let o = outlier_stats(&values, &sorted, &opts());
        assert_eq!(o["count"], serde_json::json!(1));
        assert_eq!(o["values"], serde_json::json!([100.0]));
        assert_eq!(o["percentage"], serde_json::json!(10.0));
    }

    #[test]
    fn test_outliers_none() {
        let sorted: Vec<f64> = (1..=9).map(|i| i as f64).collect();
        let o = outlier_stats(&sorted, &sorted, &opts());
        assert_eq!(o["count"], serde_json::json!(0));
    }

    #[test]
    fn test_outlier_examples_capped() {
        // With 1000 zeros, Q1 = Q3 = 0 and every 1000.0 sits past the fence.
        let mut values = vec![0.0; 1_000];
        values.extend(std::iter::repeat(1_000.0).take(200));
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let o = outlier_stats(&values, &sorted, &opts());
        assert_eq!(o["count"], serde_json::json!(200));
        assert_eq!(o["values"].as_array().unwrap().len(), 100);
    }

    // ==================== normal math tests ====================

    #[test]
    fn test_normal_quantile_known_values() {
        assert!(normal_quantile(0.5).abs() < 1e-9);
        assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-4);
        assert!((normal_quantile(0.025) + 1.959964).abs() < 1e-4);
    }

    #[test]
    fn test_normal_quantile_out_of_range_is_nan() {
        assert!(normal_quantile(0.0).is_nan());
        assert!(normal_quantile(1.0).is_nan());
    }

    #[test]
    fn test_normal_sf_known_values() {
        assert!((normal_sf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_sf(1.96) - 0.025).abs() < 1e-4);
        assert!(normal_sf(10.0) < 1e-12);
    }
}
