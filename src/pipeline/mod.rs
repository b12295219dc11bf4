//! Model output pipeline.
//!
//! Streamed calls go delta → [`stream`] segmentation → visible/thinking
//! channels; at stream end the visible text may be handed to [`structuring`]
//! and then [`normalize`]. Non-streamed calls pass the complete text straight
//! to extraction. Each stage is usable on its own.

pub mod normalize;
pub mod stream;
pub mod structuring;

use thiserror::Error;

use normalize::{CanonicalRecord, NormalizeError, RecordSchema, ResponseNormalizer};
use stream::{SegmentedOutput, StreamError, StreamOutcome};
use structuring::{FailureStage, MalformedOutput, StructuredExtractor};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage}: {source}")]
    Extraction {
        stage: FailureStage,
        #[source]
        source: MalformedOutput,
    },

    #[error("{stage}: {source}")]
    Decode {
        stage: FailureStage,
        #[source]
        source: serde_json::Error,
    },

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("stream cancelled before completion")]
    Cancelled,
}

impl PipelineError {
    /// Stage identifier for extraction-side failures.
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            Self::Extraction { stage, .. } | Self::Decode { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Extract one JSON object from `raw` and normalize it into a complete record.
pub fn analyze_text<S: RecordSchema>(
    raw: &str,
    extractor: &StructuredExtractor,
    normalizer: &ResponseNormalizer<S>,
) -> Result<CanonicalRecord<S::Record>, PipelineError> {
    let value = extractor.extract(raw)?;
    let record = normalizer.normalize(&value)?;
    tracing::debug!(
        schema = %record.schema,
        variant = %record.variant,
        "Model output normalized"
    );
    Ok(record)
}

/// A finished streamed exchange: both channels plus the analysis of the
/// visible text. Thinking text survives every failure.
#[derive(Debug)]
pub struct StreamedAnalysis<T> {
    pub visible: String,
    pub thinking: String,
    pub outcome: StreamOutcome,
    pub record: Result<CanonicalRecord<T>, PipelineError>,
}

/// Run the visible channel of a completed stream through extraction and
/// normalization. Cancelled and failed streams keep their channels but skip
/// the analysis.
pub fn finish_streamed<S: RecordSchema>(
    streamed: Result<SegmentedOutput, StreamError>,
    extractor: &StructuredExtractor,
    normalizer: &ResponseNormalizer<S>,
) -> StreamedAnalysis<S::Record> {
    match streamed {
        Ok(output) => {
            let record = match output.outcome {
                StreamOutcome::Completed => analyze_text(&output.visible, extractor, normalizer),
                StreamOutcome::Cancelled => Err(PipelineError::Cancelled),
                StreamOutcome::Failed => Err(PipelineError::Stream(StreamError::Protocol(
                    "stream ended in failure".into(),
                ))),
            };
            StreamedAnalysis {
                visible: output.visible,
                thinking: output.thinking,
                outcome: output.outcome,
                record,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Streamed exchange failed, skipping analysis");
            let (visible, thinking) = err
                .partial_output()
                .map(|p| (p.visible.clone(), p.thinking.clone()))
                .unwrap_or_default();
            StreamedAnalysis {
                visible,
                thinking,
                outcome: StreamOutcome::Failed,
                record: Err(PipelineError::Stream(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::{CropAnalytics, CropAnalyticsSchema, GrowthPhaseListSchema};
    use crate::pipeline::stream::{segment_stream, AnnotationMarkers, CancelToken};
    use futures_util::stream as futures_stream;
    use serde_json::json;

    fn crop_normalizer() -> ResponseNormalizer<CropAnalyticsSchema> {
        ResponseNormalizer::new(CropAnalyticsSchema)
    }

    // ── Non-streamed ────────────────────────────────────

    #[test]
    fn fenced_response_with_trailing_comma_normalizes() {
        let raw = "```json\n{\"qualityMetrics\": {\"qualityScore\": 91, \"suitabilityScore\": 60,},}\n```";
        let record = analyze_text(raw, &StructuredExtractor::default(), &crop_normalizer()).unwrap();
        let quality = &record.record.quality_metrics;
        assert_eq!(quality.quality_score, 65.0);
        assert!(!quality.export_quality);
        assert_eq!(record.record.market_summary.confidence, 85);
    }

    #[test]
    fn unrecoverable_text_reports_stage() {
        let err = analyze_text(
            "the model declined to answer",
            &StructuredExtractor::failing(FailureStage::InvalidResponseFormat),
            &crop_normalizer(),
        )
        .unwrap_err();
        assert_eq!(err.stage(), Some(FailureStage::InvalidResponseFormat));
        assert!(err.to_string().starts_with("invalid response format: "));
    }

    #[test]
    fn fallback_policy_feeds_normalizer() {
        let extractor = StructuredExtractor::with_fallback(json!({}));
        let record = analyze_text("no json here", &extractor, &crop_normalizer()).unwrap();
        assert_eq!(record.record, CropAnalytics::default());
    }

    #[test]
    fn growth_phases_fall_back_end_to_end() {
        let extractor = StructuredExtractor::with_fallback(json!({"phases": []}));
        let normalizer = ResponseNormalizer::new(GrowthPhaseListSchema);
        let record = analyze_text("{ broken", &extractor, &normalizer).unwrap();
        assert_eq!(record.record.phases.len(), 4);
    }

    // ── Streamed ────────────────────────────────────────

    #[tokio::test]
    async fn streamed_exchange_analyzes_visible_channel() {
        let deltas = vec![
            Ok::<_, String>("<think>check the ".to_string()),
            Ok("grades</th".to_string()),
            Ok("ink>{\"qualityMetrics\": {\"suitabilityScore\": 85, ".to_string()),
            Ok("\"exportQuality\": true}}".to_string()),
        ];
        let output = segment_stream(
            futures_stream::iter(deltas),
            AnnotationMarkers::default(),
            &CancelToken::new(),
            |_| {},
        )
        .await;

        let analysis = finish_streamed(output, &StructuredExtractor::default(), &crop_normalizer());
        assert_eq!(analysis.outcome, StreamOutcome::Completed);
        assert_eq!(analysis.thinking, "check the grades");
        let record = analysis.record.unwrap();
        assert!(record.record.quality_metrics.export_quality);
    }

    #[tokio::test]
    async fn transport_failure_keeps_thinking() {
        let deltas = vec![
            Ok("<think>partial reasoning".to_string()),
            Err("connection reset".to_string()),
        ];
        let output = segment_stream(
            futures_stream::iter(deltas),
            AnnotationMarkers::default(),
            &CancelToken::new(),
            |_| {},
        )
        .await;

        let analysis = finish_streamed(output, &StructuredExtractor::default(), &crop_normalizer());
        assert_eq!(analysis.outcome, StreamOutcome::Failed);
        assert_eq!(analysis.thinking, "partial reasoning");
        assert!(matches!(analysis.record, Err(PipelineError::Stream(_))));
    }

    #[tokio::test]
    async fn cancelled_exchange_skips_analysis() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let output = segment_stream(
            futures_stream::iter(vec![Ok::<_, String>("{\"a\": 1}".to_string())]),
            AnnotationMarkers::default(),
            &cancel,
            |_| {},
        )
        .await;

        let analysis = finish_streamed(output, &StructuredExtractor::default(), &crop_normalizer());
        assert_eq!(analysis.outcome, StreamOutcome::Cancelled);
        assert!(analysis.visible.is_empty());
        assert!(matches!(analysis.record, Err(PipelineError::Cancelled)));
    }
}
