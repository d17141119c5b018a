//! Random sampling helpers.
//!
//! All sampling in the calculators goes through these functions so a caller
//! can pin a seed and get reproducible runs. With no seed, the RNG is
//! entropy-seeded per call.

use polars::prelude::*;
use rand::prelude::*;

use crate::error::Result;

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Draw `n` distinct indices from `0..len` without replacement.
///
/// Returns all indices (in order) when `n >= len`.
pub fn sample_indices(len: usize, n: usize, seed: Option<u64>) -> Vec<u32> {
    if n >= len {
        return (0..len as u32).collect();
    }
    let mut rng = rng_from(seed);
    let indices: Vec<u32> = (0..len as u32).collect();
    indices.choose_multiple(&mut rng, n).copied().collect()
}

/// Draw up to `n` values from a slice without replacement.
pub fn sample_values(values: &[f64], n: usize, seed: Option<u64>) -> Vec<f64> {
    if n >= values.len() {
        return values.to_vec();
    }
    let mut rng = rng_from(seed);
    values.choose_multiple(&mut rng, n).copied().collect()
}

/// Draw a random row sample of size `n` from a frame.
///
/// Returns the frame unchanged when it has `n` rows or fewer.
pub fn sample_rows(df: &DataFrame, n: usize, seed: Option<u64>) -> Result<DataFrame> {
    if df.height() <= n {
        return Ok(df.clone());
    }
    let idx = IdxCa::from_vec("sample_idx".into(), sample_indices(df.height(), n, seed));
    Ok(df.take(&idx)?)
}

/// Draw a random sample of size `n` from a series.
pub fn sample_series(series: &Series, n: usize, seed: Option<u64>) -> Result<Series> {
    if series.len() <= n {
        return Ok(series.clone());
    }
    let idx = IdxCa::from_vec("sample_idx".into(), sample_indices(series.len(), n, seed));
    Ok(series.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_indices_small_input_returns_all() {
        let idx = sample_indices(5, 10, Some(1));
        assert_eq!(idx, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sample_indices_distinct() {
        let idx = sample_indices(1000, 100, Some(42));
        assert_eq!(idx.len(), 100);
        let mut sorted = idx.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 100);
    }

    #[test]
    fn test_sample_indices_seeded_reproducible() {
        let a = sample_indices(1000, 50, Some(7));
        let b = sample_indices(1000, 50, Some(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_rows_caps_height() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), (0..100i64).collect::<Vec<_>>()).into(),
        ])
        .unwrap();
        let sampled = sample_rows(&df, 10, Some(3)).unwrap();
        assert_eq!(sampled.height(), 10);

        let unchanged = sample_rows(&df, 200, Some(3)).unwrap();
        assert_eq!(unchanged.height(), 100);
    }

    #[test]
    fn test_sample_series() {
        let s = Series::new("v".into(), (0..50i64).collect::<Vec<_>>());
        let sampled = sample_series(&s, 5, Some(9)).unwrap();
        assert_eq!(sampled.len(), 5);
    }
}
