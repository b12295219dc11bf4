//! Cultivation consult records: growth phase timelines and full crop plans.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{clamp_vocabulary, default_group, lenient_vec, strings};
use crate::pipeline::normalize::confidence::DEFAULT_CONFIDENCE;
use crate::pipeline::normalize::variants::{rename, ResponseVariant};
use crate::pipeline::normalize::RecordSchema;

// ═══════════════════════════════════════════════════════════
// Growth phases
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPhase {
    #[serde(alias = "phase", alias = "stage", alias = "title")]
    pub name: String,
    #[serde(default, alias = "days", alias = "timeline")]
    pub duration: String,
    #[serde(default, alias = "tasks", alias = "activities")]
    pub key_activities: Vec<String>,
}

impl GrowthPhase {
    fn new(name: &str, duration: &str, activities: &[&str]) -> Self {
        Self {
            name: name.into(),
            duration: duration.into(),
            key_activities: strings(activities),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPhaseList {
    #[serde(deserialize_with = "lenient_vec")]
    pub phases: Vec<GrowthPhase>,
}

impl Default for GrowthPhaseList {
    fn default() -> Self {
        Self {
            phases: default_phases(),
        }
    }
}

/// The four-phase timeline shown when the model gives nothing usable.
pub fn default_phases() -> Vec<GrowthPhase> {
    vec![
        GrowthPhase::new(
            "Land Preparation",
            "1-2 weeks",
            &["Plough and level the field", "Incorporate farmyard manure"],
        ),
        GrowthPhase::new(
            "Sowing",
            "1 week",
            &["Treat seed before sowing", "Maintain recommended spacing"],
        ),
        GrowthPhase::new(
            "Crop Growth",
            "8-12 weeks",
            &["Irrigate at critical stages", "Monitor for pests and disease"],
        ),
        GrowthPhase::new(
            "Harvest",
            "1-2 weeks",
            &["Harvest at physiological maturity", "Dry produce before storage"],
        ),
    ]
}

const PHASE_VARIANTS: &[ResponseVariant] = &[
    ResponseVariant {
        name: "growth_phases",
        renames: &[rename("/growthPhases", "/phases")],
    },
    ResponseVariant {
        name: "stages",
        renames: &[rename("/stages", "/phases")],
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct GrowthPhaseListSchema;

impl RecordSchema for GrowthPhaseListSchema {
    type Record = GrowthPhaseList;

    fn name(&self) -> &'static str {
        "growth_phases"
    }

    fn groups(&self) -> &'static [&'static str] {
        &["phases"]
    }

    fn group_default(&self, group: &str) -> Option<Value> {
        match group {
            "phases" => serde_json::to_value(default_phases()).ok(),
            _ => None,
        }
    }

    fn variants(&self) -> &'static [ResponseVariant] {
        PHASE_VARIANTS
    }

    fn enforce(&self, record: &mut GrowthPhaseList) {
        record.phases.retain(|phase| !phase.name.trim().is_empty());
        if record.phases.is_empty() {
            tracing::warn!("No usable growth phases in response, using default timeline");
            record.phases = default_phases();
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Consult plan
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultPlan {
    pub overview: PlanOverview,
    pub soil_preparation: SoilPreparation,
    pub irrigation: IrrigationPlan,
    pub pest_management: PestManagement,
    pub economics: Economics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOverview {
    pub crop_name: String,
    pub season: String,
    pub duration_days: u32,
    pub suitability: String,
}

impl Default for PlanOverview {
    fn default() -> Self {
        Self {
            crop_name: "Unknown crop".into(),
            season: "kharif".into(),
            duration_days: 120,
            suitability: "moderate".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilPreparation {
    #[serde(deserialize_with = "lenient_vec")]
    pub steps: Vec<String>,
    pub fertilizer: FertilizerPlan,
}

impl Default for SoilPreparation {
    fn default() -> Self {
        Self {
            steps: strings(&["Deep ploughing followed by two harrowings"]),
            fertilizer: FertilizerPlan::default(),
        }
    }
}

/// Nutrient dose in kg per acre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerPlan {
    pub nitrogen_kg: f64,
    pub phosphorus_kg: f64,
    pub potassium_kg: f64,
    pub organic: String,
}

impl Default for FertilizerPlan {
    fn default() -> Self {
        Self {
            nitrogen_kg: 40.0,
            phosphorus_kg: 20.0,
            potassium_kg: 20.0,
            organic: "2 tonnes farmyard manure per acre".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationPlan {
    pub method: String,
    pub interval_days: u32,
    #[serde(deserialize_with = "lenient_vec")]
    pub critical_stages: Vec<String>,
}

impl Default for IrrigationPlan {
    fn default() -> Self {
        Self {
            method: "furrow".into(),
            interval_days: 10,
            critical_stages: strings(&["flowering", "grain filling"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PestManagement {
    #[serde(deserialize_with = "lenient_vec")]
    pub common_pests: Vec<String>,
    #[serde(deserialize_with = "lenient_vec")]
    pub controls: Vec<String>,
}

impl Default for PestManagement {
    fn default() -> Self {
        Self {
            common_pests: Vec::new(),
            controls: strings(&["Adopt integrated pest management practices"]),
        }
    }
}

/// Per-acre economics in rupees. `net_return_per_acre` is always derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Economics {
    pub cost_per_acre: f64,
    pub expected_yield_quintals: f64,
    pub expected_price_per_quintal: f64,
    pub net_return_per_acre: f64,
    pub risk_level: String,
    pub confidence: u32,
}

impl Default for Economics {
    fn default() -> Self {
        Self {
            cost_per_acre: 15000.0,
            expected_yield_quintals: 10.0,
            expected_price_per_quintal: 2200.0,
            net_return_per_acre: 7000.0,
            risk_level: "medium".into(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl Economics {
    pub fn gross_return(&self) -> f64 {
        self.expected_yield_quintals * self.expected_price_per_quintal
    }
}

const PLAN_GROUPS: &[&str] = &[
    "overview",
    "soilPreparation",
    "irrigation",
    "pestManagement",
    "economics",
];

const PLAN_VARIANTS: &[ResponseVariant] = &[ResponseVariant {
    name: "snake_case",
    renames: &[
        rename("/soil_preparation", "/soilPreparation"),
        rename("/pest_management", "/pestManagement"),
        rename("/overview/crop_name", "/overview/cropName"),
        rename("/overview/duration_days", "/overview/durationDays"),
        rename("/irrigation/interval_days", "/irrigation/intervalDays"),
        rename("/irrigation/critical_stages", "/irrigation/criticalStages"),
        rename("/pestManagement/common_pests", "/pestManagement/commonPests"),
        rename("/economics/cost_per_acre", "/economics/costPerAcre"),
        rename("/economics/expected_yield", "/economics/expectedYieldQuintals"),
        rename("/economics/expected_price", "/economics/expectedPricePerQuintal"),
        rename("/economics/risk_level", "/economics/riskLevel"),
    ],
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsultPlanSchema;

impl RecordSchema for ConsultPlanSchema {
    type Record = ConsultPlan;

    fn name(&self) -> &'static str {
        "consult_plan"
    }

    fn groups(&self) -> &'static [&'static str] {
        PLAN_GROUPS
    }

    fn group_default(&self, group: &str) -> Option<Value> {
        match group {
            "overview" => default_group::<PlanOverview>(),
            "soilPreparation" => default_group::<SoilPreparation>(),
            "irrigation" => default_group::<IrrigationPlan>(),
            "pestManagement" => default_group::<PestManagement>(),
            "economics" => default_group::<Economics>(),
            _ => None,
        }
    }

    fn variants(&self) -> &'static [ResponseVariant] {
        PLAN_VARIANTS
    }

    fn confidence_fields(&self) -> &'static [&'static str] {
        &["/economics/confidence"]
    }

    fn enforce(&self, record: &mut ConsultPlan) {
        let economics = &mut record.economics;
        economics.cost_per_acre = economics.cost_per_acre.max(0.0);
        economics.expected_yield_quintals = economics.expected_yield_quintals.max(0.0);
        economics.expected_price_per_quintal = economics.expected_price_per_quintal.max(0.0);
        economics.net_return_per_acre = economics.gross_return() - economics.cost_per_acre;
        clamp_vocabulary(&mut economics.risk_level, &["low", "medium", "high"], "medium");

        if record.irrigation.interval_days == 0 {
            record.irrigation.interval_days = IrrigationPlan::default().interval_days;
        }
    }
}
