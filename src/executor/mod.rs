//! Task execution infrastructure.
//!
//! Worker threads, their deques and the pool that owns them.

pub(crate) mod job;
pub(crate) mod latch;
pub mod panic_handler;
pub mod pool;
pub(crate) mod sleep;
pub mod worker;

pub use job::TaskId;
pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use pool::{ForkJoinPool, PoolStats, WorkerStatsSnapshot};
pub use worker::WorkerId;
