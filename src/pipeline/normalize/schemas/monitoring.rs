//! Field monitoring records, one schema per analysis category.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{clamp_vocabulary, default_group, lenient_vec, strings};
use crate::pipeline::normalize::confidence::DEFAULT_CONFIDENCE;
use crate::pipeline::normalize::variants::{rename, ResponseVariant};
use crate::pipeline::normalize::RecordSchema;

const SEVERITIES: &[&str] = &["none", "low", "medium", "high", "critical"];
const STATUSES: &[&str] = &["healthy", "watch", "affected", "critical"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisCategory {
    Pest,
    Disease,
    Nutrient,
    Irrigation,
}

impl AnalysisCategory {
    pub const ALL: [AnalysisCategory; 4] = [
        AnalysisCategory::Pest,
        AnalysisCategory::Disease,
        AnalysisCategory::Nutrient,
        AnalysisCategory::Irrigation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisCategory::Pest => "pest",
            AnalysisCategory::Disease => "disease",
            AnalysisCategory::Nutrient => "nutrient",
            AnalysisCategory::Irrigation => "irrigation",
        }
    }

    /// Days until the field should be checked again.
    pub fn follow_up_days(&self) -> u32 {
        match self {
            AnalysisCategory::Pest | AnalysisCategory::Disease => 7,
            AnalysisCategory::Nutrient => 14,
            AnalysisCategory::Irrigation => 3,
        }
    }
}

impl fmt::Display for AnalysisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════
// Record
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringReport {
    pub assessment: Assessment,
    pub findings: Findings,
    pub actions: MonitoringActions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub status: String,
    pub severity: String,
    pub health_score: f64,
    pub confidence: u32,
}

impl Default for Assessment {
    fn default() -> Self {
        Self {
            status: "watch".into(),
            severity: "low".into(),
            health_score: 70.0,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Findings {
    #[serde(deserialize_with = "lenient_vec")]
    pub issues: Vec<Finding>,
    pub affected_area_percent: f64,
}

/// One observed problem. Item-level key variants are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(alias = "issue", alias = "title")]
    pub name: String,
    #[serde(default, alias = "details")]
    pub description: String,
    #[serde(default = "default_finding_severity", alias = "level")]
    pub severity: String,
}

fn default_finding_severity() -> String {
    "low".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringActions {
    #[serde(deserialize_with = "lenient_vec")]
    pub immediate: Vec<String>,
    #[serde(deserialize_with = "lenient_vec")]
    pub preventive: Vec<String>,
    pub follow_up_days: u32,
}

impl MonitoringActions {
    fn for_category(category: AnalysisCategory) -> Self {
        let (immediate, preventive): (&[&str], &[&str]) = match category {
            AnalysisCategory::Pest => (
                &["Scout the field for visible pest activity"],
                &["Install pheromone traps at field borders"],
            ),
            AnalysisCategory::Disease => (
                &["Remove and destroy visibly infected leaves"],
                &["Avoid overhead irrigation late in the day"],
            ),
            AnalysisCategory::Nutrient => (
                &["Collect a soil sample for testing"],
                &["Follow a balanced NPK schedule"],
            ),
            AnalysisCategory::Irrigation => (
                &["Check soil moisture at root depth"],
                &["Irrigate in early morning or evening"],
            ),
        };
        Self {
            immediate: strings(immediate),
            preventive: strings(preventive),
            follow_up_days: category.follow_up_days(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Schema
// ═══════════════════════════════════════════════════════════

const GROUPS: &[&str] = &["assessment", "findings", "actions"];

const VARIANTS: &[ResponseVariant] = &[
    ResponseVariant {
        name: "snake_case",
        renames: &[
            rename("/assessment/health_score", "/assessment/healthScore"),
            rename("/findings/affected_area", "/findings/affectedAreaPercent"),
            rename("/actions/follow_up_days", "/actions/followUpDays"),
        ],
    },
    ResponseVariant {
        name: "flat",
        renames: &[
            rename("/status", "/assessment/status"),
            rename("/severity", "/assessment/severity"),
            rename("/healthScore", "/assessment/healthScore"),
            rename("/confidence", "/assessment/confidence"),
            rename("/issues", "/findings/issues"),
            rename("/recommendations", "/actions/immediate"),
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoringSchema {
    pub category: AnalysisCategory,
}

impl MonitoringSchema {
    pub fn new(category: AnalysisCategory) -> Self {
        Self { category }
    }
}

impl RecordSchema for MonitoringSchema {
    type Record = MonitoringReport;

    fn name(&self) -> &'static str {
        match self.category {
            AnalysisCategory::Pest => "monitoring.pest",
            AnalysisCategory::Disease => "monitoring.disease",
            AnalysisCategory::Nutrient => "monitoring.nutrient",
            AnalysisCategory::Irrigation => "monitoring.irrigation",
        }
    }

    fn groups(&self) -> &'static [&'static str] {
        GROUPS
    }

    fn group_default(&self, group: &str) -> Option<Value> {
        match group {
            "assessment" => default_group::<Assessment>(),
            "findings" => default_group::<Findings>(),
            "actions" => serde_json::to_value(MonitoringActions::for_category(self.category)).ok(),
            _ => None,
        }
    }

    fn variants(&self) -> &'static [ResponseVariant] {
        VARIANTS
    }

    fn confidence_fields(&self) -> &'static [&'static str] {
        &["/assessment/confidence"]
    }

    fn enforce(&self, record: &mut MonitoringReport) {
        clamp_vocabulary(&mut record.assessment.severity, SEVERITIES, "low");
        clamp_vocabulary(&mut record.assessment.status, STATUSES, "watch");
        for issue in &mut record.findings.issues {
            clamp_vocabulary(&mut issue.severity, SEVERITIES, "low");
        }
        record.findings.issues.retain(|issue| !issue.name.trim().is_empty());

        record.assessment.health_score = record.assessment.health_score.clamp(0.0, 100.0);
        record.findings.affected_area_percent =
            record.findings.affected_area_percent.clamp(0.0, 100.0);
        if record.actions.follow_up_days == 0 {
            record.actions.follow_up_days = self.category.follow_up_days();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::ResponseNormalizer;
    use serde_json::json;

    fn normalize(category: AnalysisCategory, response: Value) -> MonitoringReport {
        ResponseNormalizer::new(MonitoringSchema::new(category))
            .normalize(&response)
            .unwrap()
            .record
    }

    #[test]
    fn empty_response_uses_category_defaults() {
        for category in AnalysisCategory::ALL {
            let report = normalize(category, json!({}));
            assert_eq!(report.actions.follow_up_days, category.follow_up_days());
            assert_eq!(report.assessment, Assessment::default());
            assert!(report.findings.issues.is_empty());
            assert!(!report.actions.immediate.is_empty());
        }
    }

    #[test]
    fn irrigation_follows_up_sooner_than_nutrient() {
        let irrigation = normalize(AnalysisCategory::Irrigation, json!({}));
        let nutrient = normalize(AnalysisCategory::Nutrient, json!({}));
        assert!(irrigation.actions.follow_up_days < nutrient.actions.follow_up_days);
    }

    #[test]
    fn schema_name_carries_category() {
        assert_eq!(
            MonitoringSchema::new(AnalysisCategory::Disease).name(),
            "monitoring.disease"
        );
    }

    #[test]
    fn issue_aliases_and_bad_items() {
        let report = normalize(
            AnalysisCategory::Pest,
            json!({
                "findings": {
                    "issues": [
                        {"issue": "Aphids", "details": "Underside of leaves", "level": "HIGH"},
                        {"name": "Whitefly"},
                        "not an object",
                        {"description": "missing name"}
                    ]
                }
            }),
        );
        let issues = &report.findings.issues;
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].name, "Aphids");
        assert_eq!(issues[0].description, "Underside of leaves");
        assert_eq!(issues[0].severity, "high");
        assert_eq!(issues[1].severity, "low");
    }

    #[test]
    fn severity_clamped_to_vocabulary() {
        let report = normalize(
            AnalysisCategory::Disease,
            json!({"assessment": {"severity": "apocalyptic", "status": "Affected"}}),
        );
        assert_eq!(report.assessment.severity, "low");
        assert_eq!(report.assessment.status, "affected");
    }

    #[test]
    fn flat_variant_mapped() {
        let canonical = ResponseNormalizer::new(MonitoringSchema::new(AnalysisCategory::Nutrient))
            .normalize(&json!({
                "severity": "medium",
                "healthScore": "62",
                "confidence": "80%",
                "recommendations": ["Apply zinc sulphate"]
            }))
            .unwrap();
        assert_eq!(canonical.variant, "flat");
        let report = canonical.record;
        assert_eq!(report.assessment.severity, "medium");
        assert_eq!(report.assessment.health_score, 62.0);
        assert_eq!(report.assessment.confidence, 80);
        assert_eq!(report.actions.immediate, vec!["Apply zinc sulphate"]);
        assert_eq!(report.actions.follow_up_days, 14);
    }

    #[test]
    fn scores_clamped_and_zero_follow_up_restored() {
        let report = normalize(
            AnalysisCategory::Irrigation,
            json!({
                "assessment": {"healthScore": 140},
                "findings": {"affectedAreaPercent": -5},
                "actions": {"followUpDays": 0}
            }),
        );
        assert_eq!(report.assessment.health_score, 100.0);
        assert_eq!(report.findings.affected_area_percent, 0.0);
        assert_eq!(report.actions.follow_up_days, 3);
    }
}
