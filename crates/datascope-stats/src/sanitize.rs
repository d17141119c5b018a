//! JSON sanitization for statistic payloads.
//!
//! Every numeric value written into a statistics record must be finite.
//! NaN and infinite values become JSON `null` before anything reaches the
//! store, so status readers and downstream serializers never see a
//! non-representable number.

use serde_json::{Map, Value};

/// Convert an `f64` to a JSON value, mapping NaN/Infinity to `null`.
pub fn finite(v: f64) -> Value {
    if v.is_finite() {
        serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
    } else {
        Value::Null
    }
}

/// Convert an optional `f64`, treating `None` like a non-finite value.
pub fn finite_opt(v: Option<f64>) -> Value {
    v.map_or(Value::Null, finite)
}

/// Round to 4 decimal places before conversion.
pub fn finite_round4(v: f64) -> Value {
    finite((v * 10_000.0).round() / 10_000.0)
}

/// Recursively replace any non-finite number in a JSON tree with `null`.
///
/// Payloads are normally built with [`finite`] and never contain bad
/// numbers, but sub-computations that assemble values generically are
/// passed through this walker as a final guarantee.
pub fn sanitize_value(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    *value = Value::Null;
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                sanitize_value(item);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                sanitize_value(item);
            }
        }
        _ => {}
    }
}

/// The empty-object sentinel used for payloads that could not be computed.
pub fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Check that every number in a JSON tree is finite.
pub fn all_finite(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().map_or(true, f64::is_finite),
        Value::Array(items) => items.iter().all(all_finite),
        Value::Object(map) => map.values().all(all_finite),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finite_maps_nan_to_null() {
        assert_eq!(finite(f64::NAN), Value::Null);
        assert_eq!(finite(f64::INFINITY), Value::Null);
        assert_eq!(finite(f64::NEG_INFINITY), Value::Null);
        assert_eq!(finite(1.5), json!(1.5));
    }

    #[test]
    fn test_finite_round4() {
        assert_eq!(finite_round4(0.123456), json!(0.1235));
        assert_eq!(finite_round4(1.0), json!(1.0));
    }

    #[test]
    fn test_sanitize_nested() {
        let mut v = json!({
            "a": [1.0, 2.5],
            "b": {"c": 3.0},
        });
        sanitize_value(&mut v);
        assert!(all_finite(&v));
        assert_eq!(v["a"][1], json!(2.5));
    }

    #[test]
    fn test_empty_object_sentinel() {
        let v = empty_object();
        assert!(v.as_object().unwrap().is_empty());
    }
}
