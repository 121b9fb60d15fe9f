//! Best-effort conversion of resolved values into requested types.
//!
//! Coercion never fails loudly: a value that cannot be represented as the
//! requested type yields `None`, and the store's accessors substitute the
//! caller's default. Collections are all-or-nothing.

use std::collections::{BTreeMap, HashMap};

use super::value::Value;

/// Types a configuration value can be coerced into.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

/// Coerces a lookup result, falling back to `default` on a miss or when the
/// value cannot be converted.
pub fn coerce<T: FromValue>(raw: Option<&Value>, default: T) -> T {
    raw.and_then(T::from_value).unwrap_or(default)
}

pub(crate) fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => truncate(*f),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Renders a scalar as a string. Collections and null do not coerce.
pub(crate) fn to_scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Truncates toward zero; non-finite or out-of-range floats do not convert.
fn truncate(f: f64) -> Option<i64> {
    let t = f.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        to_i64(value)
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        to_i64(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        to_i64(value).and_then(|i| u64::try_from(i).ok())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        to_f64(value)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        to_scalar_string(value)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_sequence()?.iter().map(T::from_value).collect()
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_mapping()?
            .iter()
            .map(|(k, v)| Some((k.clone(), T::from_value(v)?)))
            .collect()
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_mapping()?
            .iter()
            .map(|(k, v)| Some((k.clone(), T::from_value(v)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::normalize;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(Value::Int(123), Some(123))]
    #[case(Value::Float(23.9), Some(23))]
    #[case(Value::Float(-23.9), Some(-23))]
    #[case(Value::String(" 42 ".into()), Some(42))]
    #[case(Value::String("4.7".into()), Some(4))]
    #[case(Value::String("abc".into()), None)]
    #[case(Value::Bool(true), None)]
    #[case(Value::Null, None)]
    #[case(Value::Float(f64::NAN), None)]
    #[case(Value::Float(1e300), None)]
    fn test_integer_coercion(#[case] input: Value, #[case] expected: Option<i64>) {
        assert_eq!(i64::from_value(&input), expected);
    }

    #[rstest]
    #[case(Value::Int(3), Some(3.0))]
    #[case(Value::Float(23.45), Some(23.45))]
    #[case(Value::String("1.5".into()), Some(1.5))]
    #[case(Value::String("inf".into()), None)]
    #[case(Value::Bool(false), None)]
    fn test_float_coercion(#[case] input: Value, #[case] expected: Option<f64>) {
        assert_eq!(f64::from_value(&input), expected);
    }

    #[rstest]
    #[case(Value::Bool(true), Some(true))]
    #[case(Value::Int(1), None)]
    #[case(Value::String("true".into()), None)]
    fn test_bool_only_from_bool(#[case] input: Value, #[case] expected: Option<bool>) {
        assert_eq!(bool::from_value(&input), expected);
    }

    #[test]
    fn test_i32_is_range_checked() {
        assert_eq!(i32::from_value(&Value::Int(i64::from(i32::MAX))), Some(i32::MAX));
        assert_eq!(i32::from_value(&Value::Int(i64::from(i32::MAX) + 1)), None);
        assert_eq!(u64::from_value(&Value::Int(-1)), None);
    }

    #[test]
    fn test_string_renders_scalars_only() {
        assert_eq!(String::from_value(&Value::Int(7)), Some("7".into()));
        assert_eq!(String::from_value(&Value::Bool(true)), Some("true".into()));
        assert_eq!(String::from_value(&Value::Null), None);
        assert_eq!(String::from_value(&Value::from(vec!["a"])), None);
    }

    #[test]
    fn test_collections_are_all_or_nothing() {
        let ints = normalize(&json!([12, 34, 36])).unwrap();
        assert_eq!(Vec::<i32>::from_value(&ints), Some(vec![12, 34, 36]));

        let mixed = normalize(&json!([12, "abc"])).unwrap();
        assert_eq!(Vec::<i32>::from_value(&mixed), None);

        let map = normalize(&json!({"k": "v", "k1": 23})).unwrap();
        assert_eq!(HashMap::<String, i32>::from_value(&map), None);
        assert_eq!(
            HashMap::<String, String>::from_value(&map).unwrap()["k1"],
            "23"
        );

        let nested = normalize(&json!({"k": [1, 2]})).unwrap();
        assert_eq!(HashMap::<String, String>::from_value(&nested), None);
        assert_eq!(
            BTreeMap::<String, Vec<i64>>::from_value(&nested).unwrap()["k"],
            vec![1, 2]
        );
    }

    #[test]
    fn test_wrong_collection_kind() {
        let map = normalize(&json!({"a": 1})).unwrap();
        assert_eq!(Vec::<i32>::from_value(&map), None);
        let seq = normalize(&json!([1])).unwrap();
        assert_eq!(HashMap::<String, i32>::from_value(&seq), None);
    }

    #[test]
    fn test_coerce_falls_back_to_default() {
        assert_eq!(coerce(None, 34), 34);
        assert_eq!(coerce(Some(&Value::String("x".into())), 34), 34);
        assert_eq!(coerce(Some(&Value::Int(5)), 34), 5);
        assert_eq!(coerce::<Vec<i32>>(None, Vec::new()), Vec::<i32>::new());
    }
}
