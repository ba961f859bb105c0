use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::EditError;

/// Cooperative cancellation flag shared between the caller driving a tool
/// call and the engine executing it. Checked at coarse suspension points
/// only; never cleared once set.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(EditError::OperationAborted)` if the signal has been
    /// raised. Call this at every suspension point named in the engine's
    /// state machine before performing further work.
    pub fn check(&self) -> Result<(), EditError> {
        if self.is_aborted() {
            Err(EditError::OperationAborted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unset() {
        let s = AbortSignal::new();
        assert!(!s.is_aborted());
        assert!(s.check().is_ok());
    }

    #[test]
    fn abort_is_sticky_and_shared() {
        let s = AbortSignal::new();
        let clone = s.clone();
        clone.abort();
        assert!(s.is_aborted());
        assert!(matches!(s.check(), Err(EditError::OperationAborted)));
    }
}
