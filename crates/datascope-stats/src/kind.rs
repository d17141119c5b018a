//! Column kind classification.
//!
//! Every column is classified exactly once into a closed set of kinds, and
//! the tagged value is carried through the rest of the pipeline — downstream
//! code never re-inspects dtypes ad hoc.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Inferred kind of a column, driving which statistics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point values.
    Numeric,
    /// String, boolean, or categorical values.
    Categorical,
    /// Temporal, nested, or otherwise unsupported values.
    Other,
}

impl ColumnKind {
    /// String representation used in stored statistics records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Other => "other",
        }
    }
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Classify a dtype into a [`ColumnKind`].
pub fn classify_dtype(dtype: &DataType) -> ColumnKind {
    if is_numeric_dtype(dtype) {
        ColumnKind::Numeric
    } else if matches!(
        dtype,
        DataType::String | DataType::Boolean | DataType::Categorical(_, _)
    ) {
        ColumnKind::Categorical
    } else {
        ColumnKind::Other
    }
}

/// Classify a series by its dtype.
pub fn classify_series(series: &Series) -> ColumnKind {
    classify_dtype(series.dtype())
}

/// Classify every column of a frame, in column order.
///
/// Callers analyzing large tables run this over a bounded row sample; the
/// classification depends only on the schema, so any sample is sufficient.
pub fn classify_columns(df: &DataFrame) -> Vec<(String, ColumnKind)> {
    df.get_columns()
        .iter()
        .map(|col| {
            (
                col.name().to_string(),
                classify_dtype(col.as_materialized_series().dtype()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_numeric_dtypes() {
        assert_eq!(classify_dtype(&DataType::Int64), ColumnKind::Numeric);
        assert_eq!(classify_dtype(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(classify_dtype(&DataType::UInt8), ColumnKind::Numeric);
    }

    #[test]
    fn test_classify_categorical_dtypes() {
        assert_eq!(classify_dtype(&DataType::String), ColumnKind::Categorical);
        assert_eq!(classify_dtype(&DataType::Boolean), ColumnKind::Categorical);
    }

    #[test]
    fn test_classify_other_dtypes() {
        assert_eq!(classify_dtype(&DataType::Date), ColumnKind::Other);
        assert_eq!(
            classify_dtype(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            ColumnKind::Other
        );
    }

    #[test]
    fn test_classify_columns_preserves_order() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), &[1.0f64, 2.0]).into(),
            Series::new("b".into(), &["x", "y"]).into(),
            Series::new("c".into(), &[1i64, 2]).into(),
        ])
        .unwrap();

        let kinds = classify_columns(&df);
        assert_eq!(kinds[0], ("a".to_string(), ColumnKind::Numeric));
        assert_eq!(kinds[1], ("b".to_string(), ColumnKind::Categorical));
        assert_eq!(kinds[2], ("c".to_string(), ColumnKind::Numeric));
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(ColumnKind::Numeric.as_str(), "numeric");
        assert_eq!(ColumnKind::Categorical.as_str(), "categorical");
        assert_eq!(ColumnKind::Other.as_str(), "other");
    }
}
