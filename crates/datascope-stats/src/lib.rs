//! Column and dataset statistics over Polars DataFrames.
//!
//! This crate is the pure-computation half of datascope: given a column (or
//! a table) it produces JSON statistics payloads, with no knowledge of
//! tasks, stores, or scheduling.
//!
//! # Overview
//!
//! - [`kind`] classifies every column once into a closed set of kinds
//!   (numeric / categorical / other); the tag drives everything downstream.
//! - [`column`] computes per-column statistics: basic aggregates,
//!   distribution payloads (histogram, boxplot, QQ plot or value counts),
//!   shape statistics (skewness/kurtosis or entropy), and IQR outliers.
//! - [`dataset`] computes cross-column aggregates from one shared row
//!   sample: correlation matrix with p-values, parallel coordinates,
//!   violin data, heatmap, scatter matrix.
//! - [`sanitize`] guarantees that no NaN or infinite number ever reaches a
//!   serialized payload.
//!
//! # Example
//!
//! ```rust,ignore
//! use datascope_stats::{classify_series, compute_column_stats, StatsOptions};
//! use polars::prelude::*;
//!
//! let series = Series::new("price".into(), &[1.0f64, 2.0, 3.0]);
//! let kind = classify_series(&series);
//! let stats = compute_column_stats(&series, kind, &StatsOptions::default())?;
//! println!("{}", stats.basic_stats);
//! ```
//!
//! Failure of an individual sub-computation (one histogram, one violin
//! payload) is absorbed and replaced with an empty object; only failures
//! that make the whole column or table unreadable surface as
//! [`StatsError`].

pub mod column;
pub mod dataset;
pub mod error;
pub mod kind;
pub mod numeric;
pub mod sample;
pub mod sanitize;
pub mod types;

pub use column::compute_column_stats;
pub use dataset::compute_dataset_stats;
pub use error::{Result, StatsError};
pub use kind::{classify_columns, classify_dtype, classify_series, ColumnKind};
pub use types::{ColumnStatistics, DatasetStatistics, StatsOptions};
