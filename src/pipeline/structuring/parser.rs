use serde::de::DeserializeOwned;
use serde_json::Value;

use super::repair::{isolate_object, strip_code_fences, REPAIR_CHAIN};
use super::{ExtractionOutcome, FailurePolicy, FailureStage, MalformedOutput};
use crate::pipeline::PipelineError;

/// Recover one JSON object from raw model text.
///
/// Fences are stripped and the text is sliced to its outermost braces before
/// a strict parse. If that fails, the repair chain is applied cumulatively and
/// parsing retried after each pass. All-or-nothing: a partial object is never
/// returned.
pub fn extract_object(raw: &str) -> ExtractionOutcome {
    let unfenced = strip_code_fences(raw);
    let Some(sliced) = isolate_object(&unfenced) else {
        return Err(MalformedOutput::new("no JSON object present", unfenced));
    };

    if let Some(value) = parse_object(sliced) {
        return Ok(value);
    }

    let mut attempt = sliced.to_string();
    for pass in REPAIR_CHAIN {
        attempt = (pass.apply)(&attempt);
        if let Some(value) = parse_object(&attempt) {
            tracing::debug!(
                pass = pass.name,
                stage = ?pass.stage,
                "Recovered JSON object after repair"
            );
            return Ok(value);
        }
    }

    Err(MalformedOutput::new(
        "no JSON object recoverable after repairs",
        attempt,
    ))
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Extractor with an explicit failure policy.
#[derive(Debug, Clone, Default)]
pub struct StructuredExtractor {
    policy: FailurePolicy,
}

impl StructuredExtractor {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// Substitute `fallback` when nothing is recoverable.
    pub fn with_fallback(fallback: Value) -> Self {
        Self::new(FailurePolicy::UseFallback(fallback))
    }

    /// Raise a `stage`-prefixed error when nothing is recoverable.
    pub fn failing(stage: FailureStage) -> Self {
        Self::new(FailurePolicy::Fail(stage))
    }

    pub fn policy(&self) -> &FailurePolicy {
        &self.policy
    }

    pub fn extract(&self, raw: &str) -> Result<Value, PipelineError> {
        match extract_object(raw) {
            Ok(value) => Ok(value),
            Err(malformed) => match &self.policy {
                FailurePolicy::UseFallback(fallback) => {
                    tracing::warn!(
                        reason = %malformed.reason,
                        raw_len = raw.len(),
                        "Model output unrecoverable, using fallback"
                    );
                    Ok(fallback.clone())
                }
                FailurePolicy::Fail(stage) => Err(PipelineError::Extraction {
                    stage: *stage,
                    source: malformed,
                }),
            },
        }
    }

    /// Extract and deserialize into `T` under the same policy.
    pub fn extract_into<T: DeserializeOwned>(&self, raw: &str) -> Result<T, PipelineError> {
        let value = self.extract(raw)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Ok(parsed),
            Err(e) => match &self.policy {
                FailurePolicy::UseFallback(fallback) => {
                    tracing::warn!(error = %e, "Recovered object has wrong shape, using fallback");
                    serde_json::from_value(fallback.clone()).map_err(|source| {
                        PipelineError::Decode {
                            stage: FailureStage::InvalidResponseFormat,
                            source,
                        }
                    })
                }
                FailurePolicy::Fail(stage) => Err(PipelineError::Decode {
                    stage: *stage,
                    source: e,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    // ── Strict path ─────────────────────────────────────

    #[test]
    fn clean_object_parses() {
        assert_eq!(extract_object(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn prose_wrapped_object() {
        let raw = "Sure! Here is the analysis:\n{\"crop\": \"Wheat\", \"score\": 82}\nHope this helps.";
        assert_eq!(
            extract_object(raw).unwrap(),
            json!({"crop": "Wheat", "score": 82})
        );
    }

    // ── Repairs ─────────────────────────────────────────

    #[test]
    fn fenced_trailing_comma_matches_clean_parse() {
        let repaired = extract_object("```json\n{\"a\":1,}\n```").unwrap();
        let clean = extract_object(r#"{"a":1}"#).unwrap();
        assert_eq!(repaired, clean);
    }

    #[test]
    fn single_quotes_repaired() {
        let value = extract_object("{'crop': 'Rice', 'season': 'Kharif'}").unwrap();
        assert_eq!(value, json!({"crop": "Rice", "season": "Kharif"}));
    }

    #[test]
    fn bare_keys_and_trailing_comma_repaired() {
        let value = extract_object("{crop: \"Maize\", yield_tons: 3.2,}").unwrap();
        assert_eq!(value, json!({"crop": "Maize", "yield_tons": 3.2}));
    }

    #[test]
    fn comma_brace_inside_single_quoted_value_kept() {
        let value = extract_object("{'note': 'sow, }later'}").unwrap();
        assert_eq!(value, json!({"note": "sow, }later"}));
    }

    #[test]
    fn apostrophe_in_value_survives_repairs() {
        let value = extract_object("{\"note\": \"farmer's pick\", 'grade': 'A',}").unwrap();
        assert_eq!(value["note"], "farmer's pick");
        assert_eq!(value["grade"], "A");
    }

    #[test]
    fn raw_newline_inside_string_repaired_by_collapse() {
        let value = extract_object("{\"advice\": \"irrigate early\n  before noon\"}").unwrap();
        assert_eq!(value["advice"], "irrigate early before noon");
    }

    #[test]
    fn nested_objects_with_prose_braces() {
        let raw = "Result {see below}: {\"a\": {\"b\": [1, 2,]}}";
        // First `{` belongs to the prose, so the slice cannot parse.
        assert!(extract_object(raw).is_err());
    }

    // ── Failures ────────────────────────────────────────

    #[test]
    fn no_braces_is_malformed() {
        let err = extract_object("no braces here").unwrap_err();
        assert_eq!(err.reason, "no JSON object present");
        assert_eq!(err.last_attempt, "no braces here");
    }

    #[test]
    fn unrecoverable_keeps_furthest_attempt() {
        let err = extract_object("{ this is\n not json }").unwrap_err();
        assert_eq!(err.reason, "no JSON object recoverable after repairs");
        assert_eq!(err.last_attempt, "{ this is not json }");
    }

    // ── Policy ──────────────────────────────────────────

    #[test]
    fn fallback_policy_substitutes() {
        let extractor = StructuredExtractor::with_fallback(json!({"phases": []}));
        assert_eq!(extractor.extract("garbage").unwrap(), json!({"phases": []}));
    }

    #[test]
    fn fail_policy_prefixes_stage() {
        let extractor = StructuredExtractor::failing(FailureStage::InvalidResponseFormat);
        let err = extractor.extract("garbage").unwrap_err();
        assert!(err.to_string().starts_with("invalid response format: "));
    }

    #[test]
    fn default_policy_fails_with_extraction_stage() {
        let err = StructuredExtractor::default().extract("nothing").unwrap_err();
        assert!(err.to_string().starts_with("extraction failed: "));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Phase {
        name: String,
    }

    #[test]
    fn extract_into_typed() {
        let phase: Phase = StructuredExtractor::default()
            .extract_into("```json\n{'name': 'Sowing'}\n```")
            .unwrap();
        assert_eq!(phase.name, "Sowing");
    }

    #[test]
    fn extract_into_wrong_shape_uses_fallback() {
        let extractor = StructuredExtractor::with_fallback(json!({"name": "Land preparation"}));
        let phase: Phase = extractor.extract_into(r#"{"title": "x"}"#).unwrap();
        assert_eq!(phase.name, "Land preparation");
    }

    #[test]
    fn extract_into_wrong_shape_fails_under_fail_policy() {
        let extractor = StructuredExtractor::failing(FailureStage::InvalidResponseFormat);
        let result: Result<Phase, _> = extractor.extract_into(r#"{"title": "x"}"#);
        assert!(matches!(result, Err(PipelineError::Decode { .. })));
    }
}
