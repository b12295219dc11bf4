//! Chat-completion streaming wire format.
//!
//! Providers with incremental delivery send server-sent-event lines:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Wheat"}}]}
//! data: {"choices":[{"delta":{"reasoning_content":"check soil"}}]}
//! data: [DONE]
//! ```
//!
//! `reasoning_content` arrives on a separate field with some providers. It is
//! decoded as its own frame and routed to the thinking channel directly, so
//! it never interacts with inline `<think>` blocks in `content`.

use std::fmt;
use std::future::ready;

use futures_util::{stream, Stream, StreamExt};
use serde::Deserialize;

use super::segmenter::StreamChunk;
use super::StreamError;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One meaningful item of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Delta(String),
    Reasoning(String),
    Done,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
    reasoning_content: Option<String>,
}

/// Turns raw event-stream lines into frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkDecoder;

impl ChunkDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one line. Blank lines, comments and non-data fields yield no
    /// frames. A chunk carrying both fields yields reasoning first.
    pub fn decode_line(&self, line: &str) -> Result<Vec<SseFrame>, StreamError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Ok(Vec::new());
        };
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return Ok(vec![SseFrame::Done]);
        }
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        let chunk: ChatChunk = serde_json::from_str(payload)
            .map_err(|e| StreamError::Protocol(format!("undecodable chunk: {e}")))?;

        let mut frames = Vec::new();
        if let Some(choice) = chunk.choices.into_iter().next() {
            if let Some(reasoning) = choice.delta.reasoning_content.filter(|r| !r.is_empty()) {
                frames.push(SseFrame::Reasoning(reasoning));
            }
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                frames.push(SseFrame::Delta(content));
            }
        }
        Ok(frames)
    }
}

/// Adapt a stream of event-stream lines into a stream of typed chunks.
///
/// Ends at `[DONE]` or when the line stream ends. Line errors and undecodable
/// chunks surface as items so the session loop treats them as transport
/// failures.
pub fn sse_deltas<S, E>(
    lines: S,
    decoder: ChunkDecoder,
) -> impl Stream<Item = Result<StreamChunk, StreamError>>
where
    S: Stream<Item = Result<String, E>>,
    E: fmt::Display,
{
    lines
        .flat_map(move |line| {
            let frames: Vec<Result<SseFrame, StreamError>> = match line {
                Ok(line) => match decoder.decode_line(&line) {
                    Ok(frames) => frames.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                },
                Err(e) => vec![Err(StreamError::Protocol(e.to_string()))],
            };
            stream::iter(frames)
        })
        .take_while(|frame| ready(!matches!(frame, Ok(SseFrame::Done))))
        .filter_map(|frame| {
            ready(match frame {
                Ok(SseFrame::Delta(text)) => Some(Ok(StreamChunk::Text(text))),
                Ok(SseFrame::Reasoning(text)) => Some(Ok(StreamChunk::Reasoning(text))),
                Ok(SseFrame::Done) => None,
                Err(e) => Some(Err(e)),
            })
        })
}
