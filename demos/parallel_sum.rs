//! Parallel sum of an inclusive integer range
//!
//! Run with: cargo run --example parallel_sum -- 1 40 3

use forkjoin::prelude::*;
use std::time::Instant;

struct RangeSum {
    start: i64,
    end: i64,
    threshold: i64,
}

impl RecursiveTask for RangeSum {
    type Output = i64;

    fn is_leaf(&self) -> bool {
        self.end - self.start < self.threshold
    }

    fn solve(&self) -> Result<i64> {
        tracing::trace!(start = self.start, end = self.end, "leaf");
        Ok((self.start..=self.end).sum())
    }

    fn split(&self) -> Vec<Self> {
        let middle = self.start + (self.end - self.start) / 2;
        vec![
            RangeSum {
                start: self.start,
                end: middle,
                threshold: self.threshold,
            },
            RangeSum {
                start: middle + 1,
                end: self.end,
                threshold: self.threshold,
            },
        ]
    }

    fn combine(&self, results: Vec<i64>) -> Result<i64> {
        Ok(results.into_iter().sum())
    }
}

fn parse_arg(args: &[String], index: usize, default: i64) -> Result<i64> {
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::invalid_input(format!("not an integer: {}", raw))),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let start = parse_arg(&args, 1, 1)?;
    let end = parse_arg(&args, 2, 40)?;
    let threshold = parse_arg(&args, 3, 3)?;

    if end < start {
        return Err(Error::invalid_input(format!("empty range {}..={}", start, end)));
    }
    if threshold < 1 {
        return Err(Error::invalid_input("threshold must be at least 1"));
    }

    init()?;
    let pool = global_pool()?;

    let timer = Instant::now();
    let sum = pool.invoke(RangeSum {
        start,
        end,
        threshold,
    })?;
    let elapsed = timer.elapsed();

    println!("sum of [{}, {}] = {}", start, end, sum);
    tracing::info!(
        workers = pool.num_threads(),
        stolen = pool.stats().jobs_stolen(),
        ?elapsed,
        "done"
    );

    shutdown();
    Ok(())
}
