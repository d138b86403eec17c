//! The fork/join task contract.
//!
//! A task decides from its own size whether to solve directly or to split
//! into two or more children. Children run through [`invoke_all`] and, for
//! value-producing tasks, the parent combines their results once all of them
//! finished. Results flow back as return values; children never write into
//! their parent.
//!
//! Implement [`RecursiveTask`] for work that produces a value and
//! [`RecursiveAction`] for work that only has side effects. For one-off
//! tasks [`Recursive`] builds a value task from closures.

pub mod closure;
pub mod handle;
pub mod state;

pub use closure::{Recursive, RecursiveBuilder};
pub use handle::{invoke_all, ForkJoinTask};
pub use state::TaskState;

use crate::error::{Error, Result};

/// Recursively divisible work that produces a value.
///
/// The granularity threshold is the implementor's business: `is_leaf`
/// should return true once the input is small enough that solving it
/// sequentially is cheaper than forking. Too small a threshold drowns the
/// work in scheduling overhead, too large a threshold leaves workers idle.
/// The threshold never affects the result.
pub trait RecursiveTask: Send + Sized + 'static {
    type Output: Clone + Send + 'static;

    /// Whether this task is below its granularity threshold.
    fn is_leaf(&self) -> bool;

    /// Solves the task sequentially.
    fn solve(&self) -> Result<Self::Output>;

    /// Splits the task into at least two children.
    fn split(&self) -> Vec<Self>;

    /// Merges child results, given in the order `split` returned them.
    fn combine(&self, results: Vec<Self::Output>) -> Result<Self::Output>;

    /// Solves or splits, forks and combines.
    fn compute(&self) -> Result<Self::Output> {
        if self.is_leaf() {
            return self.solve();
        }

        let children = self.split();
        if children.len() < 2 {
            return Err(Error::InvalidSplit(children.len()));
        }

        let handles: Vec<ForkJoinTask<Self::Output>> =
            children.into_iter().map(ForkJoinTask::from_task).collect();
        let results = invoke_all(&handles)?;
        self.combine(results)
    }
}

/// Recursively divisible work with side effects only.
pub trait RecursiveAction: Send + Sized + 'static {
    /// Whether this action is below its granularity threshold.
    fn is_leaf(&self) -> bool;

    /// Performs the action sequentially.
    fn run_leaf(&self) -> Result<()>;

    /// Splits the action into at least two children.
    fn split(&self) -> Vec<Self>;

    /// Runs directly or splits and waits for all children.
    fn compute(&self) -> Result<()> {
        if self.is_leaf() {
            return self.run_leaf();
        }

        let children = self.split();
        if children.len() < 2 {
            return Err(Error::InvalidSplit(children.len()));
        }

        let handles: Vec<ForkJoinTask<()>> =
            children.into_iter().map(ForkJoinTask::from_action).collect();
        invoke_all(&handles).map(|_| ())
    }
}
