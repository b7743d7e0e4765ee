//! Amount formatting and lenient numeric input
//!
//! Receipt and label payloads come from the business layer as loosely typed
//! JSON. Numbers may arrive as numbers, numeric strings, null or garbage;
//! anything unparseable becomes 0 rather than failing the print.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Thousands separator used on printed amounts
pub const GROUP_SEPARATOR: char = ' ';

/// Format an amount with thousand grouping and no decimals
///
/// `1234567.6` → `"1 234 568"`, non-finite → `"0"`.
pub fn format_amount(value: f64) -> String {
    let value = if value.is_finite() { value.round() } else { 0.0 };
    let negative = value < 0.0;
    let digits = format!("{:.0}", value.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(c);
    }

    if negative && grouped != "0" {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a quantity: integers plain, fractions with up to 3 decimals
pub fn format_quantity(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    if value.fract() == 0.0 {
        return format!("{:.0}", value);
    }
    let s = format!("{:.3}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Coerce a JSON value to a finite number, 0 when impossible
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            cleaned.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Serde helper: any value → f64, malformed → 0
pub fn lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_number).unwrap_or(0.0))
}

/// Serde helper: absent/null → None, anything else coerced
pub fn lenient_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(coerce_number(&v)),
    })
}
