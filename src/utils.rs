// Utility functions and helpers
// Truthiness, equality and ordering shared by the evaluator and built-ins

use std::cmp::Ordering;

use crate::value::Value;

/// Truthiness of a value in a boolean context
///
/// None, false, zero, empty strings and empty containers are falsy.
/// Dates, datetimes and functions are always truthy; a delta is truthy
/// when non-zero.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(n) => *n != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
        Value::Delta(delta) => !delta.is_zero(),
        Value::Date(_) | Value::DateTime(_) | Value::Function(_) => true,
    }
}

/// Name of a value's type as shown in error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
        Value::Date(_) => "date",
        Value::DateTime(_) => "datetime",
        Value::Delta(_) => "relativedelta",
        Value::Function(_) => "function",
    }
}

/// Numeric view of a value; booleans count as 0 and 1
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Int(n) => Some(*n),
        _ => None,
    }
}

/// Equality used by `==`, `in` and container comparison.
///
/// Numbers compare by value across int, float and bool.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (integral(a), integral(b)) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x == y;
    }
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

/// Ordering used by `<`, `max`, `min` and friends.
///
/// Returns `None` for values that have no defined order between them.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (integral(a), integral(b)) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                if !values_equal(l, r) {
                    return compare(l, r);
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => None,
    }
}

/// Resolve a possibly negative index against a sequence length.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

/// Clamp optional slice bounds to `0..=len`, resolving negatives from the end.
pub fn slice_bounds(start: Option<i64>, stop: Option<i64>, len: usize) -> (usize, usize) {
    let clamp = |bound: i64| -> usize {
        let signed_len = i64::try_from(len).unwrap_or(i64::MAX);
        let resolved = if bound < 0 { bound + signed_len } else { bound };
        usize::try_from(resolved.clamp(0, signed_len)).unwrap_or(0)
    };
    let lo = start.map_or(0, clamp);
    let hi = stop.map_or(len, clamp);
    (lo, hi.max(lo))
}

/// Text used when a value becomes a dictionary key.
pub fn key_string(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&Value::Int(0)));
        assert!(!is_truthy(&Value::from("")));
        assert!(!is_truthy(&Value::from(Vec::<Value>::new())));
        assert!(is_truthy(&Value::Float(0.5)));
        assert!(is_truthy(&Value::from("0")));
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert!(values_equal(&Value::Int(1), &Value::Float(1.0)));
        assert!(values_equal(&Value::Bool(true), &Value::Int(1)));
        assert!(!values_equal(&Value::Int(1), &Value::from("1")));
        assert!(values_equal(
            &Value::from(vec![Value::Int(2)]),
            &Value::from(vec![Value::Float(2.0)])
        ));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(&Value::Int(1), &Value::Float(1.5)), Some(Ordering::Less));
        assert_eq!(compare(&Value::from("b"), &Value::from("a")), Some(Ordering::Greater));
        assert_eq!(compare(&Value::from("a"), &Value::Int(1)), None);
        assert_eq!(
            compare(
                &Value::from(vec![Value::Int(1), Value::Int(2)]),
                &Value::from(vec![Value::Int(1)])
            ),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_index_helpers() {
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-4, 3), None);
        assert_eq!(slice_bounds(Some(1), None, 4), (1, 4));
        assert_eq!(slice_bounds(Some(-2), Some(100), 4), (2, 4));
        assert_eq!(slice_bounds(Some(3), Some(1), 4), (3, 3));
    }
}
