//! Panic capture for task bodies.

use crate::error::Error;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

/// What happens when a task's `compute` panics.
///
/// With every strategy except `Abort` the panic is converted into
/// [`Error::TaskPanicked`] on the task and the worker thread keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Log the panic and terminate the process.
    Abort,
    /// Capture the panic without logging.
    Isolate,
    /// Capture the panic and log it at `warn`.
    #[default]
    LogAndContinue,
}

/// Runs closures under `catch_unwind` and applies the pool's strategy.
#[derive(Debug)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    caught: AtomicU64,
}

impl PanicHandler {
    pub const fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            caught: AtomicU64::new(0),
        }
    }

    pub fn execute<F, R>(&self, f: F) -> Result<R, PanicInfo>
    where
        F: FnOnce() -> R,
    {
        let payload = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => return Ok(value),
            Err(payload) => payload,
        };

        self.caught.fetch_add(1, Ordering::Relaxed);
        let info = PanicInfo {
            message: payload_message(payload.as_ref()),
        };

        match self.strategy {
            PanicStrategy::Abort => {
                tracing::error!(message = %info.message, "task panicked, aborting");
                std::process::abort();
            }
            PanicStrategy::Isolate => {}
            PanicStrategy::LogAndContinue => {
                tracing::warn!(message = %info.message, "task panicked");
            }
        }

        Err(info)
    }

    /// Panics caught since the handler was created.
    pub fn caught(&self) -> u64 {
        self.caught.load(Ordering::Relaxed)
    }
}

/// Message of a caught panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    pub message: String,
}

impl From<PanicInfo> for Error {
    fn from(info: PanicInfo) -> Self {
        Error::TaskPanicked(info.message)
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
