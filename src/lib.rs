//! forkjoin - work-stealing fork/join parallelism
//!
//! A pool of worker threads for CPU-bound divide-and-conquer work. A task
//! either solves its input directly or splits it into children that run in
//! parallel; the parent then combines their results.
//!
//! # Quick Start
//!
//! ```no_run
//! use forkjoin::prelude::*;
//!
//! struct Sum {
//!     start: u64,
//!     end: u64,
//! }
//!
//! impl RecursiveTask for Sum {
//!     type Output = u64;
//!
//!     fn is_leaf(&self) -> bool {
//!         self.end - self.start < 1_000
//!     }
//!
//!     fn solve(&self) -> Result<u64> {
//!         Ok((self.start..=self.end).sum())
//!     }
//!
//!     fn split(&self) -> Vec<Self> {
//!         let middle = self.start + (self.end - self.start) / 2;
//!         vec![
//!             Sum { start: self.start, end: middle },
//!             Sum { start: middle + 1, end: self.end },
//!         ]
//!     }
//!
//!     fn combine(&self, results: Vec<u64>) -> Result<u64> {
//!         Ok(results.into_iter().sum())
//!     }
//! }
//!
//! let pool = ForkJoinPool::new(Config::default()).unwrap();
//! let sum = pool.invoke(Sum { start: 1, end: 1_000_000 }).unwrap();
//! assert_eq!(sum, 500_000_500_000);
//! ```
//!
//! # Scheduling
//!
//! - **Local LIFO**: a worker pushes forked tasks to the head of its own
//!   deque and pops from the head, so it finishes the most recent fork first
//! - **Tail stealing**: idle workers steal the oldest task of another worker
//! - **Helping joins**: a worker waiting on a task runs other work meanwhile
//! - **Exactly once**: a task's body runs once no matter how many queue
//!   entries, thieves or joiners race for it

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod runtime;
pub mod task;
pub mod util;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder, StealPolicy};
pub use error::{Error, Result};
pub use executor::{ForkJoinPool, PanicStrategy, PoolStats, TaskId};
pub use runtime::{global_pool, init, init_with_config, shutdown};
pub use task::{
    invoke_all, ForkJoinTask, Recursive, RecursiveAction, RecursiveBuilder, RecursiveTask,
    TaskState,
};
pub use util::CancelFlag;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_round_trip() {
        let pool = ForkJoinPool::with_threads(2).unwrap();
        let task = pool.spawn(|| Ok(21 * 2)).unwrap();
        assert_eq!(task.join(), Ok(42));
        pool.shutdown();
        assert!(pool.is_terminated());
    }
}
