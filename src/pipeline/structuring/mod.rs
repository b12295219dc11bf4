pub mod parser;
pub mod repair;

pub use parser::*;
pub use repair::*;

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// No JSON object could be recovered from the model text.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed model output: {reason}")]
pub struct MalformedOutput {
    pub reason: String,
    /// Furthest-repaired text, for diagnostics.
    pub last_attempt: String,
}

impl MalformedOutput {
    pub fn new(reason: impl Into<String>, last_attempt: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            last_attempt: last_attempt.into(),
        }
    }
}

pub type ExtractionOutcome = Result<Value, MalformedOutput>;

/// Stage identifier prefixed to user-facing failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    ExtractionFailed,
    InvalidResponseFormat,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtractionFailed => write!(f, "extraction failed"),
            Self::InvalidResponseFormat => write!(f, "invalid response format"),
        }
    }
}

/// What the extractor does when no object is recoverable.
#[derive(Debug, Clone, PartialEq)]
pub enum FailurePolicy {
    /// Substitute this value. For best-effort, non-critical data.
    UseFallback(Value),
    /// Raise a stage-prefixed error. For structured analyses where a wrong
    /// result is worse than none.
    Fail(FailureStage),
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::Fail(FailureStage::ExtractionFailed)
    }
}
