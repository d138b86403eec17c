use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag.
///
/// The pool never interrupts a running task. A task that wants to be
/// cancellable captures a clone of this flag and calls [`check`](Self::check)
/// at its recursion boundaries, typically at the top of `compute`.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Error::Cancelled)` once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_visible_through_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(clone.check().is_ok());

        flag.cancel();

        assert!(clone.is_cancelled());
        assert_eq!(clone.check(), Err(Error::Cancelled));
    }
}
