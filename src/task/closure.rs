//! Recursive tasks assembled from closures.

use super::RecursiveTask;
use crate::error::{Error, Result};
use std::sync::Arc;

type SizeFn<I> = dyn Fn(&I) -> usize + Send + Sync;
type SolveFn<I, O> = dyn Fn(&I) -> Result<O> + Send + Sync;
type SplitFn<I> = dyn Fn(&I) -> Vec<I> + Send + Sync;
type CombineFn<O> = dyn Fn(Vec<O>) -> Result<O> + Send + Sync;

struct Functions<I, O> {
    threshold: usize,
    size: Box<SizeFn<I>>,
    solve: Box<SolveFn<I, O>>,
    split: Box<SplitFn<I>>,
    combine: Box<CombineFn<O>>,
}

/// A value task made of an input payload, a granularity threshold and
/// size/solve/split/combine functions.
///
/// The task is a leaf when `size(input) <= threshold`. Children share the
/// parent's functions and differ only in their payload.
///
/// ```
/// use forkjoin::{ForkJoinPool, Recursive};
///
/// let pool = ForkJoinPool::with_threads(2)?;
/// let task = Recursive::builder(1u64..101)
///     .size(|r| r.end.saturating_sub(r.start) as usize)
///     .threshold(10)
///     .solve(|r| Ok(r.clone().sum::<u64>()))
///     .split(|r| {
///         let mid = r.start + (r.end - r.start) / 2;
///         vec![r.start..mid, mid..r.end]
///     })
///     .combine(|parts| Ok(parts.into_iter().sum()))
///     .build()?;
///
/// assert_eq!(pool.invoke(task)?, 5050);
/// # Ok::<(), forkjoin::Error>(())
/// ```
pub struct Recursive<I, O> {
    input: I,
    functions: Arc<Functions<I, O>>,
}

impl<I, O> Recursive<I, O> {
    pub fn builder(input: I) -> RecursiveBuilder<I, O> {
        RecursiveBuilder {
            input,
            threshold: None,
            size: None,
            solve: None,
            split: None,
            combine: None,
        }
    }

    pub fn threshold(&self) -> usize {
        self.functions.threshold
    }
}

impl<I, O> RecursiveTask for Recursive<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    type Output = O;

    fn is_leaf(&self) -> bool {
        (self.functions.size)(&self.input) <= self.functions.threshold
    }

    fn solve(&self) -> Result<O> {
        (self.functions.solve)(&self.input)
    }

    fn split(&self) -> Vec<Self> {
        (self.functions.split)(&self.input)
            .into_iter()
            .map(|input| Recursive {
                input,
                functions: self.functions.clone(),
            })
            .collect()
    }

    fn combine(&self, results: Vec<O>) -> Result<O> {
        (self.functions.combine)(results)
    }
}

impl<I: std::fmt::Debug, O> std::fmt::Debug for Recursive<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recursive")
            .field("input", &self.input)
            .field("threshold", &self.functions.threshold)
            .finish()
    }
}

pub struct RecursiveBuilder<I, O> {
    input: I,
    threshold: Option<usize>,
    size: Option<Box<SizeFn<I>>>,
    solve: Option<Box<SolveFn<I, O>>>,
    split: Option<Box<SplitFn<I>>>,
    combine: Option<Box<CombineFn<O>>>,
}

impl<I: std::fmt::Debug, O> std::fmt::Debug for RecursiveBuilder<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveBuilder")
            .field("input", &self.input)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl<I, O> RecursiveBuilder<I, O> {
    /// Problem size of a payload, compared against the threshold.
    pub fn size<F>(mut self, f: F) -> Self
    where
        F: Fn(&I) -> usize + Send + Sync + 'static,
    {
        self.size = Some(Box::new(f));
        self
    }

    /// Largest size that is solved sequentially. Must be at least 1.
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn solve<F>(mut self, f: F) -> Self
    where
        F: Fn(&I) -> Result<O> + Send + Sync + 'static,
    {
        self.solve = Some(Box::new(f));
        self
    }

    /// Must return at least two payloads, each strictly smaller than the
    /// input, or the recursion never reaches the threshold.
    pub fn split<F>(mut self, f: F) -> Self
    where
        F: Fn(&I) -> Vec<I> + Send + Sync + 'static,
    {
        self.split = Some(Box::new(f));
        self
    }

    pub fn combine<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<O>) -> Result<O> + Send + Sync + 'static,
    {
        self.combine = Some(Box::new(f));
        self
    }

    /// Validates the definition. Nothing is scheduled here.
    pub fn build(self) -> Result<Recursive<I, O>> {
        let threshold = self
            .threshold
            .ok_or_else(|| Error::invalid_input("threshold is required"))?;
        if threshold == 0 {
            return Err(Error::invalid_input("threshold must be at least 1"));
        }

        let functions = Functions {
            threshold,
            size: self
                .size
                .ok_or_else(|| Error::invalid_input("size function is required"))?,
            solve: self
                .solve
                .ok_or_else(|| Error::invalid_input("solve function is required"))?,
            split: self
                .split
                .ok_or_else(|| Error::invalid_input("split function is required"))?,
            combine: self
                .combine
                .ok_or_else(|| Error::invalid_input("combine function is required"))?,
        };

        Ok(Recursive {
            input: self.input,
            functions: Arc::new(functions),
        })
    }
}
