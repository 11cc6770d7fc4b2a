//! Amount coercion. Malformed amounts never fail; they count as zero.

use serde_json::Value;

const CURRENCY_SYMBOLS: [char; 5] = ['$', '€', '£', '¥', '₩'];

/// Parse an amount from a JSON number or numeric string.
///
/// Strings are trimmed; one leading currency symbol and `,` thousands
/// separators are stripped. Non-finite results are rejected.
pub fn parse_amount(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_amount_str(s)?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_amount_str(s: &str) -> Option<f64> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s),
    };
    let s = s.strip_prefix(CURRENCY_SYMBOLS).unwrap_or(s).trim_start();
    let cleaned = s.replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    let n: f64 = cleaned.parse().ok()?;
    Some(if negative { -n } else { n })
}

/// Resolved amount with the zero fallback.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    value.and_then(parse_amount).unwrap_or(0.0)
}

/// Largest magnitude whose cent count still fits an `i64` without saturating.
pub const MAX_CENTS_AMOUNT: f64 = 9.0e16;

/// Amount rounded to integer cents, for equality comparisons. `None` for
/// non-finite amounts and for magnitudes at or past [`MAX_CENTS_AMOUNT`].
pub fn amount_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount.abs() >= MAX_CENTS_AMOUNT {
        return None;
    }
    Some((amount * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(coerce_amount(Some(&json!(10))), 10.0);
        assert_eq!(coerce_amount(Some(&json!(12.34))), 12.34);
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(coerce_amount(Some(&json!("12.00"))), 12.0);
        assert_eq!(coerce_amount(Some(&json!("  7.5 "))), 7.5);
        assert_eq!(coerce_amount(Some(&json!("$1,234.50"))), 1234.5);
        assert_eq!(coerce_amount(Some(&json!("-$3"))), -3.0);
        assert_eq!(coerce_amount(Some(&json!("₩15,000"))), 15000.0);
    }

    #[test]
    fn test_malformed_is_zero() {
        assert_eq!(coerce_amount(None), 0.0);
        assert_eq!(coerce_amount(Some(&json!("twelve"))), 0.0);
        assert_eq!(coerce_amount(Some(&json!(""))), 0.0);
        assert_eq!(coerce_amount(Some(&json!("NaN"))), 0.0);
        assert_eq!(coerce_amount(Some(&json!("inf"))), 0.0);
        assert_eq!(coerce_amount(Some(&json!(true))), 0.0);
        assert_eq!(coerce_amount(Some(&json!({"value": 3}))), 0.0);
    }

    #[test]
    fn test_cents() {
        assert_eq!(amount_cents(12.0), Some(1200));
        assert_eq!(amount_cents(0.1 + 0.2), Some(30));
        assert_eq!(amount_cents(-4.5), Some(-450));
    }

    #[test]
    fn test_cents_out_of_range() {
        assert_eq!(amount_cents(8.9e16), Some(8_900_000_000_000_000_000));
        assert_eq!(amount_cents(1e17), None);
        assert_eq!(amount_cents(-5e17), None);
        assert_eq!(amount_cents(f64::INFINITY), None);
    }
}
