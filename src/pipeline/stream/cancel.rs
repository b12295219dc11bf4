use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-call cancellation handle for a streamed exchange.
///
/// Clones share one flag, so the UI side keeps a clone and the consumer loop
/// keeps another. Every streamed call gets its own token; two calls never
/// observe each other's cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next delta boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_token_not_cancelled() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn clones_share_flag() {
        let token = CancelToken::new();
        let ui_side = token.clone();
        ui_side.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn independent_tokens_do_not_interfere() {
        let first = CancelToken::new();
        let second = CancelToken::new();
        first.cancel();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }
}
