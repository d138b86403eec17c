pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the pool and by task computations.
///
/// Errors are `Clone` because a single failed task reports the same error
/// to every caller of `join`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("split produced {0} subtask(s), need at least 2")]
    InvalidSplit(usize),

    #[error("task cancelled")]
    Cancelled,

    #[error("pool is shut down")]
    PoolShutdown,

    #[error("global pool already initialized")]
    AlreadyInitialized,

    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),
}

impl Error {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn task_failed<S: Into<String>>(msg: S) -> Self {
        Error::TaskFailed(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }
}
