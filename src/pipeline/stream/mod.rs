pub mod cancel;
pub mod protocol;
pub mod segmenter;
pub mod session;

pub use cancel::*;
pub use protocol::*;
pub use segmenter::*;
pub use session::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The delta stream failed. Not retried; partial channels are preserved.
    #[error("transport failure: {message}")]
    Transport {
        message: String,
        partial: SegmentedOutput,
    },

    #[error("stream protocol error: {0}")]
    Protocol(String),
}

impl StreamError {
    /// Channels accumulated before the failure, if any.
    pub fn partial_output(&self) -> Option<&SegmentedOutput> {
        match self {
            Self::Transport { partial, .. } => Some(partial),
            Self::Protocol(_) => None,
        }
    }
}
