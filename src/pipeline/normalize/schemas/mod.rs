pub mod consult;
pub mod crop_analytics;
pub mod market_audit;
pub mod monitoring;

pub use consult::*;
pub use crop_analytics::*;
pub use market_audit::*;
pub use monitoring::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Serialize a group's `Default` as its registered default value.
pub(crate) fn default_group<T: Default + Serialize>() -> Option<Value> {
    serde_json::to_value(T::default()).ok()
}

/// Deserialize a list leniently: items that cannot be read are skipped.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Vec::<Value>::deserialize(deserializer)?;
    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if parsed.len() < total {
        tracing::warn!(
            skipped = total - parsed.len(),
            kept = parsed.len(),
            "Skipped unreadable list items"
        );
    }
    Ok(parsed)
}

/// Keep `value` if it is one of `allowed` (case-insensitive), else `fallback`.
pub(crate) fn clamp_vocabulary(value: &mut String, allowed: &[&str], fallback: &str) {
    let lowered = value.trim().to_ascii_lowercase();
    match allowed.iter().find(|a| **a == lowered) {
        Some(a) => *value = (*a).to_string(),
        None => {
            tracing::debug!(value = %value, fallback, "Out-of-vocabulary value replaced");
            *value = fallback.to_string();
        }
    }
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
