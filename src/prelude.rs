pub use crate::config::{Config, ConfigBuilder, StealPolicy};
pub use crate::error::{Error, Result};
pub use crate::executor::{ForkJoinPool, PanicStrategy};
pub use crate::task::{
    invoke_all, ForkJoinTask, Recursive, RecursiveAction, RecursiveTask, TaskState,
};
pub use crate::util::CancelFlag;
pub use crate::{global_pool, init, init_with_config, shutdown};
