//! One-shot completion signal.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Set once when a task reaches a terminal state.
///
/// `probe` is a lock-free check for joiners that are busy helping; `wait`
/// and `wait_timeout` block on a condition variable.
#[derive(Debug, Default)]
pub(crate) struct Latch {
    set: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn probe(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        let _guard = self.lock.lock();
        self.set.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    pub fn wait(&self) {
        let mut guard = self.lock.lock();
        while !self.set.load(Ordering::Acquire) {
            self.condvar.wait(&mut guard);
        }
    }

    /// Returns whether the latch is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.lock.lock();
        if !self.set.load(Ordering::Acquire) {
            let _ = self.condvar.wait_for(&mut guard, timeout);
        }
        self.set.load(Ordering::Acquire)
    }
}
