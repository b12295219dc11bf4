//! Default-driven deep merge.
//!
//! The default value is the template: its keys decide which fields exist and
//! its leaf types decide what the model is allowed to put there. Nested
//! objects are merged independently, so a model that fills one field of a
//! nested group keeps the defaults of its siblings.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[₹$]?\s*(-?(?:\d[\d,]*(?:\.\d+)?|\.\d+))").expect("valid regex")
});

/// Merge `incoming` over `default`, returning a value shaped like `default`.
///
/// - absent or `null` → default
/// - object default → recurse per key; unknown incoming keys are dropped
/// - array default → incoming array (nulls stripped from object items);
///   an empty incoming array keeps a non-empty default
/// - number default → number or numeric string; integer defaults truncate
/// - bool default → bool or `"true"`/`"false"`/`"yes"`/`"no"`
/// - string default → string, or a number rendered as text
/// - anything else incompatible → default
pub fn merge_with_default(default: &Value, incoming: Option<&Value>) -> Value {
    let Some(incoming) = incoming.filter(|v| !v.is_null()) else {
        return default.clone();
    };

    match default {
        Value::Object(defaults) => match incoming {
            Value::Object(fields) => Value::Object(
                defaults
                    .iter()
                    .map(|(key, d)| (key.clone(), merge_with_default(d, fields.get(key))))
                    .collect(),
            ),
            _ => default.clone(),
        },
        Value::Array(default_items) => match incoming {
            Value::Array(items) if items.is_empty() && !default_items.is_empty() => {
                default.clone()
            }
            Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
            _ => default.clone(),
        },
        Value::Number(n) => coerce_number(incoming, n).unwrap_or_else(|| default.clone()),
        Value::Bool(_) => coerce_bool(incoming)
            .map(Value::Bool)
            .unwrap_or_else(|| default.clone()),
        Value::String(_) => match incoming {
            Value::String(_) => incoming.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            _ => default.clone(),
        },
        Value::Null => incoming.clone(),
    }
}

/// Parse a leading number the way a lenient display layer would:
/// `"92%"` → 92, `"₹2,450/qtl"` → 2450, `"high"` → `None`.
pub fn leading_number(text: &str) -> Option<f64> {
    let captures = LEADING_NUMBER_RE.captures(text)?;
    let digits = captures.get(1)?.as_str().replace(',', "");
    digits.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

/// Coerce toward the numeric kind of `template`.
fn coerce_number(incoming: &Value, template: &Number) -> Option<Value> {
    let n = as_f64(incoming)?;
    if template.is_u64() {
        (n >= 0.0).then(|| Value::from(n.trunc() as u64))
    } else if template.is_i64() {
        Some(Value::from(n.trunc() as i64))
    } else {
        Number::from_f64(n).map(Value::Number)
    }
}

fn coerce_bool(incoming: &Value) -> Option<bool> {
    match incoming {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Remove `null` members from objects so item defaults apply on deserialize.
fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> Value {
        json!({
            "score": 0.0,
            "count": 3,
            "label": "moderate",
            "flag": false,
            "tags": [],
            "nested": {"premium": 20.0, "standard": 50.0, "substandard": 30.0}
        })
    }

    // ── Absent / null ───────────────────────────────────

    #[test]
    fn absent_returns_default() {
        assert_eq!(merge_with_default(&template(), None), template());
    }

    #[test]
    fn empty_object_returns_default() {
        assert_eq!(merge_with_default(&template(), Some(&json!({}))), template());
    }

    #[test]
    fn null_leaf_takes_default() {
        let merged = merge_with_default(&template(), Some(&json!({"label": null})));
        assert_eq!(merged["label"], "moderate");
    }

    // ── Nested groups ───────────────────────────────────

    #[test]
    fn partial_nested_group_keeps_siblings() {
        let merged = merge_with_default(&template(), Some(&json!({"nested": {"premium": 10.0}})));
        assert_eq!(merged["nested"], json!({"premium": 10.0, "standard": 50.0, "substandard": 30.0}));
    }

    #[test]
    fn unknown_keys_dropped() {
        let merged = merge_with_default(&template(), Some(&json!({"extra": 1})));
        assert!(merged.get("extra").is_none());
    }

    #[test]
    fn scalar_in_place_of_group_takes_default() {
        let merged = merge_with_default(&template(), Some(&json!({"nested": "n/a"})));
        assert_eq!(merged["nested"], template()["nested"]);
    }

    // ── Leaf coercion ───────────────────────────────────

    #[test]
    fn numeric_strings_coerced() {
        let merged = merge_with_default(&template(), Some(&json!({"score": "82.5%", "count": "7 items"})));
        assert_eq!(merged["score"], json!(82.5));
        assert_eq!(merged["count"], json!(7));
    }

    #[test]
    fn integer_default_truncates_and_rejects_negative() {
        let merged = merge_with_default(&template(), Some(&json!({"count": 4.9})));
        assert_eq!(merged["count"], json!(4));
        let merged = merge_with_default(&template(), Some(&json!({"count": -2})));
        assert_eq!(merged["count"], json!(3));
    }

    #[test]
    fn non_numeric_string_takes_default() {
        let merged = merge_with_default(&template(), Some(&json!({"score": "excellent"})));
        assert_eq!(merged["score"], json!(0.0));
    }

    #[test]
    fn bool_strings_coerced() {
        let merged = merge_with_default(&template(), Some(&json!({"flag": "Yes"})));
        assert_eq!(merged["flag"], json!(true));
        let merged = merge_with_default(&template(), Some(&json!({"flag": 1})));
        assert_eq!(merged["flag"], json!(false));
    }

    #[test]
    fn number_into_string_field() {
        let merged = merge_with_default(&template(), Some(&json!({"label": 42})));
        assert_eq!(merged["label"], "42");
    }

    // ── Arrays ──────────────────────────────────────────

    #[test]
    fn array_taken_with_nulls_stripped() {
        let merged = merge_with_default(
            &json!({"items": []}),
            Some(&json!({"items": [{"name": "Sowing", "durationDays": null}]})),
        );
        assert_eq!(merged["items"], json!([{"name": "Sowing"}]));
    }

    #[test]
    fn empty_array_keeps_non_empty_default() {
        let merged = merge_with_default(&json!({"items": ["a"]}), Some(&json!({"items": []})));
        assert_eq!(merged["items"], json!(["a"]));
    }

    #[test]
    fn leading_number_variants() {
        assert_eq!(leading_number("92%"), Some(92.0));
        assert_eq!(leading_number("₹2,450/qtl"), Some(2450.0));
        assert_eq!(leading_number(" -3.5 units"), Some(-3.5));
        assert_eq!(leading_number("high"), None);
        assert_eq!(leading_number(""), None);
    }
}
