use serde_json::Value;

use super::merge::leading_number;

/// Confidence used when the model gives none or gives something unreadable.
pub const DEFAULT_CONFIDENCE: u32 = 85;

/// Upper bound for a percentage confidence.
pub const MAX_CONFIDENCE: u32 = 100;

/// Integer-parse a confidence-like value, falling back to `default`.
///
/// Numbers are truncated, strings are read up to the first non-numeric
/// character (`"92%"` → 92). Negative or unreadable values take the default;
/// values above 100 are capped.
pub fn coerce_confidence(value: Option<&Value>, default: u32) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => leading_number(s),
        _ => None,
    };

    match parsed {
        Some(n) if n >= 0.0 => (n.trunc() as u32).min(MAX_CONFIDENCE),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_takes_default() {
        assert_eq!(coerce_confidence(None, DEFAULT_CONFIDENCE), 85);
        assert_eq!(coerce_confidence(Some(&Value::Null), DEFAULT_CONFIDENCE), 85);
    }

    #[test]
    fn integer_passes_through() {
        assert_eq!(coerce_confidence(Some(&json!(72)), DEFAULT_CONFIDENCE), 72);
    }

    #[test]
    fn float_truncated() {
        assert_eq!(coerce_confidence(Some(&json!(91.9)), DEFAULT_CONFIDENCE), 91);
    }

    #[test]
    fn percent_string_parsed() {
        assert_eq!(coerce_confidence(Some(&json!("88%")), DEFAULT_CONFIDENCE), 88);
    }

    #[test]
    fn word_takes_default() {
        assert_eq!(coerce_confidence(Some(&json!("high")), DEFAULT_CONFIDENCE), 85);
    }

    #[test]
    fn negative_takes_default_and_large_capped() {
        assert_eq!(coerce_confidence(Some(&json!(-4)), 60), 60);
        assert_eq!(coerce_confidence(Some(&json!(250)), DEFAULT_CONFIDENCE), 100);
    }

    #[test]
    fn custom_default_respected() {
        assert_eq!(coerce_confidence(Some(&json!(true)), 70), 70);
    }
}
