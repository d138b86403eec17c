//! Workloads shared by the integration tests.

#![allow(dead_code)]

use forkjoin::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Sums the inclusive range `start..=end`, splitting at the midpoint until
/// `end - start < threshold`.
pub struct RangeSum {
    pub start: i64,
    pub end: i64,
    pub threshold: i64,
    pub leaves: Arc<AtomicUsize>,
    pub merges: Arc<AtomicUsize>,
}

impl RangeSum {
    pub fn new(start: i64, end: i64, threshold: i64) -> Result<Self> {
        if end < start {
            return Err(Error::invalid_input(format!("empty range {}..={}", start, end)));
        }
        if threshold < 1 {
            return Err(Error::invalid_input("threshold must be at least 1"));
        }
        Ok(Self {
            start,
            end,
            threshold,
            leaves: Arc::new(AtomicUsize::new(0)),
            merges: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn child(&self, start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            threshold: self.threshold,
            leaves: self.leaves.clone(),
            merges: self.merges.clone(),
        }
    }
}

impl RecursiveTask for RangeSum {
    type Output = i64;

    fn is_leaf(&self) -> bool {
        self.end - self.start < self.threshold
    }

    fn solve(&self) -> Result<i64> {
        self.leaves.fetch_add(1, Ordering::SeqCst);
        Ok((self.start..=self.end).sum())
    }

    fn split(&self) -> Vec<Self> {
        let middle = self.start + (self.end - self.start) / 2;
        vec![self.child(self.start, middle), self.child(middle + 1, self.end)]
    }

    fn combine(&self, results: Vec<i64>) -> Result<i64> {
        self.merges.fetch_add(1, Ordering::SeqCst);
        Ok(results.into_iter().sum())
    }
}

pub fn closed_form_sum(a: i64, b: i64) -> i64 {
    b * (b + 1) / 2 - a * (a - 1) / 2
}

/// Fibonacci with 64-bit wrapping arithmetic. Indices at or below
/// `threshold` are solved with a loop.
pub struct Fibonacci {
    pub n: u32,
    pub threshold: u32,
}

impl Fibonacci {
    pub fn new(n: i64, threshold: u32) -> Result<Self> {
        if n < 0 {
            return Err(Error::invalid_input("seq cannot be negative"));
        }
        if threshold < 1 {
            return Err(Error::invalid_input("threshold must be at least 1"));
        }
        let n = u32::try_from(n).map_err(|_| Error::invalid_input("seq too large"))?;
        Ok(Self { n, threshold })
    }
}

impl RecursiveTask for Fibonacci {
    type Output = u64;

    fn is_leaf(&self) -> bool {
        self.n <= self.threshold
    }

    fn solve(&self) -> Result<u64> {
        Ok(sequential_fib(self.n))
    }

    fn split(&self) -> Vec<Self> {
        vec![
            Fibonacci {
                n: self.n - 1,
                threshold: self.threshold,
            },
            Fibonacci {
                n: self.n - 2,
                threshold: self.threshold,
            },
        ]
    }

    fn combine(&self, results: Vec<u64>) -> Result<u64> {
        Ok(results.into_iter().fold(0u64, u64::wrapping_add))
    }
}

pub fn sequential_fib(n: u32) -> u64 {
    let (mut prev, mut curr) = (0u64, 1u64);
    if n == 0 {
        return 0;
    }
    for _ in 1..n {
        let next = prev.wrapping_add(curr);
        prev = curr;
        curr = next;
    }
    curr
}

pub fn pool(threads: usize) -> ForkJoinPool {
    ForkJoinPool::with_threads(threads).expect("pool")
}
