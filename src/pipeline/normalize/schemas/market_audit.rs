//! Market audit record: weather impact, price outlook and selling advice.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{clamp_vocabulary, default_group, lenient_vec, strings};
use crate::pipeline::normalize::confidence::DEFAULT_CONFIDENCE;
use crate::pipeline::normalize::variants::{rename, ResponseVariant};
use crate::pipeline::normalize::RecordSchema;

/// Forecasts within this fraction of the current price read as "stable".
pub const STABLE_BAND: f64 = 0.01;

const IMPACT_LEVELS: &[&str] = &["low", "moderate", "high"];
const ADVICE: &[&str] = &["sell", "hold", "partial"];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAudit {
    pub weather_impact: WeatherImpact,
    pub price_outlook: PriceOutlook,
    pub advisory: Advisory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherImpact {
    pub summary: String,
    pub impact_level: String,
    pub rainfall_outlook: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub affected_regions: Vec<String>,
}

impl Default for WeatherImpact {
    fn default() -> Self {
        Self {
            summary: "No significant weather disruption expected".into(),
            impact_level: "low".into(),
            rainfall_outlook: "normal".into(),
            affected_regions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOutlook {
    pub current_price: f64,
    pub forecast_price: f64,
    pub horizon_days: u32,
    /// Derived from the two prices; model text is ignored.
    pub direction: String,
    pub confidence: u32,
}

impl Default for PriceOutlook {
    fn default() -> Self {
        Self {
            current_price: 2200.0,
            forecast_price: 2200.0,
            horizon_days: 30,
            direction: "stable".into(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl PriceOutlook {
    pub fn derived_direction(&self) -> &'static str {
        if self.current_price <= 0.0 {
            return "stable";
        }
        let change = (self.forecast_price - self.current_price) / self.current_price;
        if change > STABLE_BAND {
            "rising"
        } else if change < -STABLE_BAND {
            "falling"
        } else {
            "stable"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub recommendation: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub rationale: Vec<String>,
}

impl Default for Advisory {
    fn default() -> Self {
        Self {
            recommendation: "hold".into(),
            rationale: strings(&["Prices are expected to stay within a narrow range"]),
        }
    }
}

/// Common model wording for an impact level outside the vocabulary.
fn impact_synonym(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "severe" | "extreme" | "critical" | "very high" | "significant" => Some("high"),
        "medium" | "moderately high" => Some("moderate"),
        "none" | "minimal" | "negligible" | "minor" => Some("low"),
        _ => None,
    }
}

const GROUPS: &[&str] = &["weatherImpact", "priceOutlook", "advisory"];

const VARIANTS: &[ResponseVariant] = &[ResponseVariant {
    name: "snake_case",
    renames: &[
        rename("/weather_impact", "/weatherImpact"),
        rename("/price_outlook", "/priceOutlook"),
        rename("/weatherImpact/impact_level", "/weatherImpact/impactLevel"),
        rename("/weatherImpact/rainfall_outlook", "/weatherImpact/rainfallOutlook"),
        rename("/weatherImpact/affected_regions", "/weatherImpact/affectedRegions"),
        rename("/priceOutlook/current_price", "/priceOutlook/currentPrice"),
        rename("/priceOutlook/forecast_price", "/priceOutlook/forecastPrice"),
        rename("/priceOutlook/horizon_days", "/priceOutlook/horizonDays"),
    ],
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct MarketAuditSchema;

impl RecordSchema for MarketAuditSchema {
    type Record = MarketAudit;

    fn name(&self) -> &'static str {
        "market_audit"
    }

    fn groups(&self) -> &'static [&'static str] {
        GROUPS
    }

    fn group_default(&self, group: &str) -> Option<Value> {
        match group {
            "weatherImpact" => default_group::<WeatherImpact>(),
            "priceOutlook" => default_group::<PriceOutlook>(),
            "advisory" => default_group::<Advisory>(),
            _ => None,
        }
    }

    fn variants(&self) -> &'static [ResponseVariant] {
        VARIANTS
    }

    fn confidence_fields(&self) -> &'static [&'static str] {
        &["/priceOutlook/confidence"]
    }

    fn enforce(&self, record: &mut MarketAudit) {
        let outlook = &mut record.price_outlook;
        outlook.direction = outlook.derived_direction().to_string();
        if outlook.horizon_days == 0 {
            outlook.horizon_days = PriceOutlook::default().horizon_days;
        }
        let impact = &mut record.weather_impact.impact_level;
        if let Some(level) = impact_synonym(impact) {
            *impact = level.to_string();
        }
        clamp_vocabulary(impact, IMPACT_LEVELS, "moderate");
        clamp_vocabulary(&mut record.advisory.recommendation, ADVICE, "hold");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::ResponseNormalizer;
    use serde_json::json;

    fn normalize(response: Value) -> MarketAudit {
        ResponseNormalizer::new(MarketAuditSchema)
            .normalize(&response)
            .unwrap()
            .record
    }

    #[test]
    fn empty_response_is_full_default() {
        assert_eq!(normalize(json!({})), MarketAudit::default());
    }

    #[test]
    fn direction_derived_from_prices() {
        let audit = normalize(json!({
            "priceOutlook": {"currentPrice": 2000, "forecastPrice": "₹2,100", "direction": "falling"}
        }));
        assert_eq!(audit.price_outlook.direction, "rising");

        let audit = normalize(json!({
            "priceOutlook": {"currentPrice": 2000, "forecastPrice": 1900}
        }));
        assert_eq!(audit.price_outlook.direction, "falling");
    }

    #[test]
    fn small_moves_read_as_stable() {
        let audit = normalize(json!({
            "priceOutlook": {"currentPrice": 2000, "forecastPrice": 2015}
        }));
        assert_eq!(audit.price_outlook.direction, "stable");
    }

    #[test]
    fn snake_case_variant_and_vocabulary() {
        let canonical = ResponseNormalizer::new(MarketAuditSchema)
            .normalize(&json!({
                "weather_impact": {"impact_level": "Storm", "affected_regions": ["Nashik", null]},
                "advisory": {"recommendation": "SELL"}
            }))
            .unwrap();
        assert_eq!(canonical.variant, "snake_case");
        let audit = canonical.record;
        assert_eq!(audit.weather_impact.impact_level, "moderate");
        assert_eq!(audit.weather_impact.affected_regions, vec!["Nashik"]);
        assert_eq!(audit.advisory.recommendation, "sell");
    }

    #[test]
    fn severe_impact_never_understated() {
        let cases = [
            ("Severe", "high"),
            ("EXTREME", "high"),
            ("medium", "moderate"),
            ("minimal", "low"),
        ];
        for (said, expected) in cases {
            let audit = normalize(json!({"weatherImpact": {"impactLevel": said}}));
            assert_eq!(audit.weather_impact.impact_level, expected, "for {said}");
        }
    }
}
