//! Crop analytics record: market summary, quality, risk and recommendations.
//!
//! Consistency rules, in order:
//! 1. `qualityScore ≤ suitabilityScore + 5` when `suitabilityScore > 0`.
//! 2. `suitabilityScore < 70` caps the premium share at 20 and floors the
//!    substandard share at 30; shares still total 100.
//! 3. `exportQuality` is false when `suitabilityScore < 80`.
//! 4. Confidence fields are integer-parsed with a default of 85.
//!
//! The defaults below satisfy all four rules, so an empty response
//! normalizes to exactly `CropAnalytics::default()`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{clamp_vocabulary, default_group, lenient_vec, strings};
use crate::pipeline::normalize::confidence::DEFAULT_CONFIDENCE;
use crate::pipeline::normalize::variants::{rename, ResponseVariant};
use crate::pipeline::normalize::RecordSchema;

pub const QUALITY_MARGIN_OVER_SUITABILITY: f64 = 5.0;
pub const LOW_SUITABILITY_THRESHOLD: f64 = 70.0;
pub const EXPORT_SUITABILITY_THRESHOLD: f64 = 80.0;
pub const LOW_SUITABILITY_PREMIUM_CAP: f64 = 20.0;
pub const LOW_SUITABILITY_SUBSTANDARD_FLOOR: f64 = 30.0;

const RISK_LEVELS: &[&str] = &["low", "medium", "high"];
const PRICE_TRENDS: &[&str] = &["rising", "stable", "falling"];

// ═══════════════════════════════════════════════════════════
// Record
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropAnalytics {
    pub market_summary: MarketSummary,
    pub quality_metrics: QualityMetrics,
    pub risk_breakdown: RiskBreakdown,
    pub recommendations: Recommendations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub crop_name: String,
    pub market_name: String,
    pub price_per_quintal: f64,
    pub price_trend: String,
    pub trading_volume_tonnes: f64,
    pub demand_level: String,
    pub confidence: u32,
}

impl Default for MarketSummary {
    fn default() -> Self {
        Self {
            crop_name: "Unknown crop".into(),
            market_name: "Local mandi".into(),
            price_per_quintal: 2200.0,
            price_trend: "stable".into(),
            trading_volume_tonnes: 120.0,
            demand_level: "medium".into(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub quality_score: f64,
    pub suitability_score: f64,
    pub export_quality: bool,
    pub moisture_percent: f64,
    pub grade_distribution: GradeDistribution,
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            quality_score: 0.0,
            suitability_score: 0.0,
            export_quality: false,
            moisture_percent: 12.0,
            grade_distribution: GradeDistribution::default(),
        }
    }
}

/// Percentage shares per grade. Totals 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDistribution {
    pub premium: f64,
    pub standard: f64,
    pub substandard: f64,
}

impl Default for GradeDistribution {
    fn default() -> Self {
        Self {
            premium: 20.0,
            standard: 50.0,
            substandard: 30.0,
        }
    }
}

impl GradeDistribution {
    pub fn total(&self) -> f64 {
        self.premium + self.standard + self.substandard
    }

    /// Scale shares proportionally to total 100. Negative shares count as 0;
    /// an all-zero or non-finite distribution resets to the default.
    pub fn rescale(&mut self) {
        self.premium = self.premium.max(0.0);
        self.standard = self.standard.max(0.0);
        self.substandard = self.substandard.max(0.0);

        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            *self = Self::default();
            return;
        }
        if (total - 100.0).abs() > f64::EPSILON * 100.0 {
            let scale = 100.0 / total;
            self.premium *= scale;
            self.standard *= scale;
            self.substandard *= scale;
        }
    }

    /// Cap premium, floor substandard, and let standard absorb the difference.
    pub fn cap_and_floor(&mut self, premium_cap: f64, substandard_floor: f64) {
        self.rescale();
        self.premium = self.premium.min(premium_cap);
        self.substandard = self.substandard.max(substandard_floor);
        self.standard = (100.0 - self.premium - self.substandard).max(0.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBreakdown {
    pub overall_risk: String,
    pub weather_risk: f64,
    pub market_risk: f64,
    pub pest_risk: f64,
    pub confidence: u32,
}

impl Default for RiskBreakdown {
    fn default() -> Self {
        Self {
            overall_risk: "medium".into(),
            weather_risk: 50.0,
            market_risk: 50.0,
            pest_risk: 50.0,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    #[serde(deserialize_with = "lenient_vec")]
    pub actions: Vec<String>,
    pub best_selling_window: String,
    pub storage_advice: String,
}

impl Default for Recommendations {
    fn default() -> Self {
        Self {
            actions: strings(&["Compare prices across nearby mandis before selling"]),
            best_selling_window: "Within 2-3 weeks of harvest".into(),
            storage_advice: "Store in a cool, dry, ventilated place".into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Schema
// ═══════════════════════════════════════════════════════════

const GROUPS: &[&str] = &[
    "marketSummary",
    "qualityMetrics",
    "riskBreakdown",
    "recommendations",
];

const VARIANTS: &[ResponseVariant] = &[
    ResponseVariant {
        name: "snake_case",
        renames: &[
            rename("/market_summary", "/marketSummary"),
            rename("/quality_metrics", "/qualityMetrics"),
            rename("/risk_breakdown", "/riskBreakdown"),
            rename("/marketSummary/crop_name", "/marketSummary/cropName"),
            rename("/marketSummary/market_name", "/marketSummary/marketName"),
            rename("/marketSummary/price_per_quintal", "/marketSummary/pricePerQuintal"),
            rename("/marketSummary/price_trend", "/marketSummary/priceTrend"),
            rename("/marketSummary/trading_volume", "/marketSummary/tradingVolumeTonnes"),
            rename("/marketSummary/demand_level", "/marketSummary/demandLevel"),
            rename("/qualityMetrics/quality_score", "/qualityMetrics/qualityScore"),
            rename("/qualityMetrics/suitability_score", "/qualityMetrics/suitabilityScore"),
            rename("/qualityMetrics/export_quality", "/qualityMetrics/exportQuality"),
            rename("/qualityMetrics/moisture", "/qualityMetrics/moisturePercent"),
            rename("/qualityMetrics/grade_distribution", "/qualityMetrics/gradeDistribution"),
            rename("/riskBreakdown/overall_risk", "/riskBreakdown/overallRisk"),
            rename("/riskBreakdown/weather_risk", "/riskBreakdown/weatherRisk"),
            rename("/riskBreakdown/market_risk", "/riskBreakdown/marketRisk"),
            rename("/riskBreakdown/pest_risk", "/riskBreakdown/pestRisk"),
            rename("/recommendations/best_selling_window", "/recommendations/bestSellingWindow"),
            rename("/recommendations/storage_advice", "/recommendations/storageAdvice"),
        ],
    },
    ResponseVariant {
        name: "flat_scores",
        renames: &[
            rename("/cropName", "/marketSummary/cropName"),
            rename("/currentPrice", "/marketSummary/pricePerQuintal"),
            rename("/qualityScore", "/qualityMetrics/qualityScore"),
            rename("/suitabilityScore", "/qualityMetrics/suitabilityScore"),
            rename("/exportQuality", "/qualityMetrics/exportQuality"),
            rename("/gradeDistribution", "/qualityMetrics/gradeDistribution"),
            rename("/confidence", "/marketSummary/confidence"),
        ],
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CropAnalyticsSchema;

impl RecordSchema for CropAnalyticsSchema {
    type Record = CropAnalytics;

    fn name(&self) -> &'static str {
        "crop_analytics"
    }

    fn groups(&self) -> &'static [&'static str] {
        GROUPS
    }

    fn group_default(&self, group: &str) -> Option<Value> {
        match group {
            "marketSummary" => default_group::<MarketSummary>(),
            "qualityMetrics" => default_group::<QualityMetrics>(),
            "riskBreakdown" => default_group::<RiskBreakdown>(),
            "recommendations" => default_group::<Recommendations>(),
            _ => None,
        }
    }

    fn variants(&self) -> &'static [ResponseVariant] {
        VARIANTS
    }

    fn confidence_fields(&self) -> &'static [&'static str] {
        &["/marketSummary/confidence", "/riskBreakdown/confidence"]
    }

    fn enforce(&self, record: &mut CropAnalytics) {
        let quality = &mut record.quality_metrics;
        let suitability = quality.suitability_score;

        if suitability > 0.0 {
            let ceiling = suitability + QUALITY_MARGIN_OVER_SUITABILITY;
            if quality.quality_score > ceiling {
                tracing::debug!(
                    quality = quality.quality_score,
                    suitability,
                    "Clamping quality score to suitability margin"
                );
                quality.quality_score = ceiling;
            }
        }

        if suitability < LOW_SUITABILITY_THRESHOLD {
            quality.grade_distribution.cap_and_floor(
                LOW_SUITABILITY_PREMIUM_CAP,
                LOW_SUITABILITY_SUBSTANDARD_FLOOR,
            );
        }

        if suitability < EXPORT_SUITABILITY_THRESHOLD {
            quality.export_quality = false;
        }

        clamp_vocabulary(&mut record.risk_breakdown.overall_risk, RISK_LEVELS, "medium");
        clamp_vocabulary(&mut record.market_summary.price_trend, PRICE_TRENDS, "stable");
    }
}
