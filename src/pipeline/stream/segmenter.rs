//! Thinking/visible channel splitter for token streams.
//!
//! Models emit internal reasoning between a start and an end marker
//! (`<think>` … `</think>` by default). The accumulator routes text outside
//! the markers to the visible channel and text inside to the thinking channel.
//!
//! Markers can straddle two deltas (`"Hello <th"` + `"ink>…"`). A buffer tail
//! that could still grow into the marker being searched for is held back in
//! `carry_over` and rescanned with the next delta, so the final channels are
//! identical however the text was chunked.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Markers
// ═══════════════════════════════════════════════════════════

/// Start/end delimiters of an annotation block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMarkers {
    pub start: String,
    pub end: String,
}

impl AnnotationMarkers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Both markers must be non-empty, otherwise the scan would never advance.
    pub fn is_valid(&self) -> bool {
        !self.start.is_empty() && !self.end.is_empty()
    }
}

impl Default for AnnotationMarkers {
    fn default() -> Self {
        Self::new("<think>", "</think>")
    }
}

// ═══════════════════════════════════════════════════════════
// Accumulator
// ═══════════════════════════════════════════════════════════

/// Text routed to each channel by one `feed` or `close` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentDelta {
    pub visible: String,
    pub thinking: String,
}

impl SegmentDelta {
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.thinking.is_empty()
    }
}

/// One unit of streamed input.
///
/// Providers that report reasoning on a separate field deliver it as
/// `Reasoning`; it goes straight to the thinking channel without marker
/// parsing, so it cannot open or close an inline annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Text(String),
    Reasoning(String),
}

impl From<String> for StreamChunk {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for StreamChunk {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Per-exchange segmentation state.
///
/// Create one with [`SegmentedAccumulator::open`] at the start of a streamed
/// call, feed every delta in arrival order, then call
/// [`close`](SegmentedAccumulator::close) (or [`cancel`](SegmentedAccumulator::cancel)).
#[derive(Debug, Clone)]
pub struct SegmentedAccumulator {
    markers: AnnotationMarkers,
    visible_so_far: String,
    thinking_so_far: String,
    inside_annotation: bool,
    /// Unterminated partial marker held between deltas.
    carry_over: String,
    finished: bool,
}

impl SegmentedAccumulator {
    pub fn open(markers: AnnotationMarkers) -> Self {
        Self {
            markers,
            visible_so_far: String::new(),
            thinking_so_far: String::new(),
            inside_annotation: false,
            carry_over: String::new(),
            finished: false,
        }
    }

    /// Consume one delta and return the text it releases to each channel.
    ///
    /// Deltas fed after `close`/`cancel` are ignored.
    pub fn feed(&mut self, delta: &str) -> SegmentDelta {
        let mut out = SegmentDelta::default();
        if self.finished {
            return out;
        }

        let mut buffer = std::mem::take(&mut self.carry_over);
        buffer.push_str(delta);
        let mut rest = buffer.as_str();

        loop {
            let marker = if self.inside_annotation {
                self.markers.end.as_str()
            } else {
                self.markers.start.as_str()
            };

            match rest.find(marker) {
                Some(idx) => {
                    route(&mut out, self.inside_annotation, &rest[..idx]);
                    rest = &rest[idx + marker.len()..];
                    self.inside_annotation = !self.inside_annotation;
                }
                None => {
                    let held = partial_marker_len(rest, marker);
                    let split = rest.len() - held;
                    route(&mut out, self.inside_annotation, &rest[..split]);
                    self.carry_over = rest[split..].to_string();
                    break;
                }
            }
        }

        self.record(&out);
        out
    }

    /// Append out-of-band reasoning to the thinking channel.
    ///
    /// Marker state and any held partial marker are left untouched.
    pub fn feed_thinking(&mut self, reasoning: &str) -> SegmentDelta {
        let mut out = SegmentDelta::default();
        if self.finished {
            return out;
        }
        out.thinking.push_str(reasoning);
        self.record(&out);
        out
    }

    /// Route one chunk by kind.
    pub fn feed_chunk(&mut self, chunk: &StreamChunk) -> SegmentDelta {
        match chunk {
            StreamChunk::Text(text) => self.feed(text),
            StreamChunk::Reasoning(reasoning) => self.feed_thinking(reasoning),
        }
    }

    /// Flush held text and finish the exchange.
    ///
    /// Inside an unterminated annotation the remainder goes to the thinking
    /// channel; otherwise a dangling partial marker is ordinary visible text.
    /// Returns `Some` exactly once; this is the terminal signal.
    pub fn close(&mut self) -> Option<SegmentDelta> {
        if self.finished {
            return None;
        }
        self.finished = true;

        let rest = std::mem::take(&mut self.carry_over);
        let mut out = SegmentDelta::default();
        route(&mut out, self.inside_annotation, &rest);
        self.record(&out);
        Some(out)
    }

    /// Finish without flushing: held text is discarded, not delivered.
    /// Returns `true` if this call is the one that finished the exchange.
    pub fn cancel(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        self.carry_over.clear();
        true
    }

    pub fn visible_so_far(&self) -> &str {
        &self.visible_so_far
    }

    pub fn thinking_so_far(&self) -> &str {
        &self.thinking_so_far
    }

    pub fn inside_annotation(&self) -> bool {
        self.inside_annotation
    }

    pub fn carry_over(&self) -> &str {
        &self.carry_over
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consume the accumulator, keeping both channels.
    pub fn into_channels(self) -> (String, String) {
        (self.visible_so_far, self.thinking_so_far)
    }

    fn record(&mut self, out: &SegmentDelta) {
        self.visible_so_far.push_str(&out.visible);
        self.thinking_so_far.push_str(&out.thinking);
    }
}

fn route(out: &mut SegmentDelta, inside_annotation: bool, text: &str) {
    if inside_annotation {
        out.thinking.push_str(text);
    } else {
        out.visible.push_str(text);
    }
}

/// Length of the longest proper prefix of `marker` that `text` ends with.
fn partial_marker_len(text: &str, marker: &str) -> usize {
    let longest = marker.len().saturating_sub(1).min(text.len());
    (1..=longest)
        .rev()
        .find(|&k| marker.is_char_boundary(k) && text.ends_with(&marker[..k]))
        .unwrap_or(0)
}

/// One-shot segmentation of a complete text.
pub fn segment_text(text: &str, markers: &AnnotationMarkers) -> (String, String) {
    let mut acc = SegmentedAccumulator::open(markers.clone());
    acc.feed(text);
    acc.close();
    acc.into_channels()
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
