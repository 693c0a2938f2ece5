//! Cooperative cancellation for per-method interpretation: the interpreter
//! polls a cancellation signal at every worklist step and between basic
//! blocks. A plain `Arc<AtomicBool>` wrapper is enough — there is no
//! suspension or resumption protocol to model, just "should this method stop
//! now".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloneable flag a caller can set from another thread (or the
/// same thread, between batch items) to ask an in-flight interpretation to
/// stop early. Cancelling never corrupts state; it just causes
/// [`crate::interp::Interpretation::complete`] to come back `false`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_observes_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
