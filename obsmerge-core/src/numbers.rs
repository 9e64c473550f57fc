//! Numeric conversion helpers centralizing safe numeric casts and scalar parsing.

use num_traits::cast::cast;
use serde_json::Value;

/// Convert a sample count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(f64::MAX)
}

/// Read a JSON scalar as a finite f64.
///
/// Numbers are taken as-is. Strings must hold a decimal number, since the
/// simulator occasionally serialises feature means as text. `NaN` and
/// infinities spelled out in strings are rejected, as is every other JSON
/// type.
#[must_use]
pub fn scalar_to_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Read a JSON scalar as a non-negative integer count.
///
/// Accepts unsigned integers, integral floats (`10.0`) and strings holding
/// either form.
#[must_use]
pub fn scalar_to_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(integral_f64_to_u64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(integral_f64_to_u64))
        }
        _ => None,
    }
}

fn integral_f64_to_u64(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        cast::<f64, u64>(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_conversion_is_exact_for_small_counts() {
        assert!((count_to_f64(0) - 0.0).abs() < f64::EPSILON);
        assert!((count_to_f64(12_345) - 12_345.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scalars_accept_numbers_and_numeric_strings() {
        assert_eq!(scalar_to_f64(&json!(1.5)), Some(1.5));
        assert_eq!(scalar_to_f64(&json!(-3)), Some(-3.0));
        assert_eq!(scalar_to_f64(&json!(" 2.25 ")), Some(2.25));
        assert_eq!(scalar_to_f64(&json!("1e3")), Some(1000.0));
    }

    #[test]
    fn scalars_reject_non_numeric_values() {
        assert_eq!(scalar_to_f64(&json!("fast")), None);
        assert_eq!(scalar_to_f64(&json!(true)), None);
        assert_eq!(scalar_to_f64(&json!(null)), None);
        assert_eq!(scalar_to_f64(&json!([1.0])), None);
        assert_eq!(scalar_to_f64(&json!({ "x": 1 })), None);
    }

    #[test]
    fn scalars_reject_non_finite_strings() {
        for text in ["NaN", "nan", "inf", "-inf", "infinity", " -Infinity "] {
            assert_eq!(scalar_to_f64(&json!(text)), None, "{text:?} accepted");
        }
        assert_eq!(scalar_to_f64(&json!("1e400")), None);
    }

    #[test]
    fn counts_accept_integral_forms_only() {
        assert_eq!(scalar_to_count(&json!(10)), Some(10));
        assert_eq!(scalar_to_count(&json!(10.0)), Some(10));
        assert_eq!(scalar_to_count(&json!("25")), Some(25));
        assert_eq!(scalar_to_count(&json!("25.0")), Some(25));
        assert_eq!(scalar_to_count(&json!(2.5)), None);
        assert_eq!(scalar_to_count(&json!(-1)), None);
        assert_eq!(scalar_to_count(&json!("many")), None);
    }
}
