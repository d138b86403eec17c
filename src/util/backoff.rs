//! Spin-then-yield backoff used before a thread parks.

use std::hint::spin_loop;
use std::thread;

/// Exponential backoff for idle loops.
///
/// The first few steps spin, the next few yield to the OS scheduler. Once
/// [`is_completed`](Backoff::is_completed) reports true the caller should
/// stop burning CPU and block instead.
#[derive(Debug, Default)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;

    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Performs one backoff step.
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1 << self.step) {
                spin_loop();
            }
        } else {
            thread::yield_now();
        }

        if self.step <= Self::YIELD_LIMIT {
            self.step += 1;
        }
    }

    /// True once spinning and yielding have been exhausted.
    pub fn is_completed(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }
}
