//! Async consumer loop for one streamed exchange.
//!
//! Pulls deltas from a transport stream, routes them through a
//! [`SegmentedAccumulator`], and reports progress as [`StreamEvent`]s.
//! The cancel token is consulted once per delta, after it arrives and before
//! it is processed. Every exit path emits exactly one `Done` event.

use std::fmt;

use futures_util::{pin_mut, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::cancel::CancelToken;
use super::segmenter::{AnnotationMarkers, SegmentDelta, SegmentedAccumulator, StreamChunk};
use super::StreamError;

/// How a streamed exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Progress event delivered to the rendering side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum StreamEvent {
    Visible(String),
    Thinking(String),
    Done { outcome: StreamOutcome },
}

/// Both channels as accumulated when the exchange ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentedOutput {
    pub visible: String,
    pub thinking: String,
    pub outcome: StreamOutcome,
}

impl SegmentedOutput {
    fn from_accumulator(acc: SegmentedAccumulator, outcome: StreamOutcome) -> Self {
        let (visible, thinking) = acc.into_channels();
        Self {
            visible,
            thinking,
            outcome,
        }
    }
}

/// Consume `stream` to the end (or until cancelled), segmenting every delta.
///
/// Transport errors are not retried: the accumulator is flushed so reasoning
/// already received is kept, `Done { Failed }` is emitted, and the partial
/// output travels inside [`StreamError::Transport`].
pub async fn segment_stream<S, D, E, F>(
    stream: S,
    markers: AnnotationMarkers,
    cancel: &CancelToken,
    mut on_event: F,
) -> Result<SegmentedOutput, StreamError>
where
    S: Stream<Item = Result<D, E>>,
    D: Into<StreamChunk>,
    E: fmt::Display,
    F: FnMut(StreamEvent),
{
    pin_mut!(stream);
    let mut acc = SegmentedAccumulator::open(markers);
    let mut deltas = 0usize;

    while let Some(item) = stream.next().await {
        if cancel.is_cancelled() {
            acc.cancel();
            tracing::debug!(deltas, "Stream cancelled, dropping pending delta");
            on_event(StreamEvent::Done {
                outcome: StreamOutcome::Cancelled,
            });
            return Ok(SegmentedOutput::from_accumulator(
                acc,
                StreamOutcome::Cancelled,
            ));
        }

        match item {
            Ok(delta) => {
                deltas += 1;
                emit(&mut on_event, acc.feed_chunk(&delta.into()));
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(deltas, error = %message, "Stream transport failed");
                if let Some(flush) = acc.close() {
                    emit(&mut on_event, flush);
                }
                on_event(StreamEvent::Done {
                    outcome: StreamOutcome::Failed,
                });
                return Err(StreamError::Transport {
                    message,
                    partial: SegmentedOutput::from_accumulator(acc, StreamOutcome::Failed),
                });
            }
        }
    }

    if let Some(flush) = acc.close() {
        emit(&mut on_event, flush);
    }
    tracing::debug!(
        deltas,
        visible_len = acc.visible_so_far().len(),
        thinking_len = acc.thinking_so_far().len(),
        "Stream completed"
    );
    on_event(StreamEvent::Done {
        outcome: StreamOutcome::Completed,
    });
    Ok(SegmentedOutput::from_accumulator(
        acc,
        StreamOutcome::Completed,
    ))
}

/// [`segment_stream`] forwarding events over a channel.
///
/// A dropped receiver does not stop consumption; the caller still gets the
/// accumulated output.
pub async fn segment_stream_to_channel<S, D, E>(
    stream: S,
    markers: AnnotationMarkers,
    cancel: &CancelToken,
    events: UnboundedSender<StreamEvent>,
) -> Result<SegmentedOutput, StreamError>
where
    S: Stream<Item = Result<D, E>>,
    D: Into<StreamChunk>,
    E: fmt::Display,
{
    segment_stream(stream, markers, cancel, |event| {
        let _ = events.send(event);
    })
    .await
}

fn emit<F: FnMut(StreamEvent)>(on_event: &mut F, delta: SegmentDelta) {
    if !delta.visible.is_empty() {
        on_event(StreamEvent::Visible(delta.visible));
    }
    if !delta.thinking.is_empty() {
        on_event(StreamEvent::Thinking(delta.thinking));
    }
}
