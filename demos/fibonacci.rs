//! Fibonacci by binary recursion with a sequential cutoff
//!
//! Run with: cargo run --example fibonacci -- 500 499
//!
//! Values wrap at 64 bits, so large indices print F(n) mod 2^64.

use forkjoin::prelude::*;

struct Fibonacci {
    n: u32,
    threshold: u32,
}

impl RecursiveTask for Fibonacci {
    type Output = u64;

    fn is_leaf(&self) -> bool {
        self.n <= self.threshold
    }

    fn solve(&self) -> Result<u64> {
        let (mut prev, mut curr) = (0u64, 1u64);
        if self.n == 0 {
            return Ok(0);
        }
        for _ in 1..self.n {
            let next = prev.wrapping_add(curr);
            prev = curr;
            curr = next;
        }
        Ok(curr)
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

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let seq: i64 = match args.get(1) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::invalid_input(format!("not an integer: {}", raw)))?,
        None => 500,
    };
    let threshold: u32 = match args.get(2) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::invalid_input(format!("not a threshold: {}", raw)))?,
        None => 499,
    };

    if seq < 0 {
        return Err(Error::invalid_input("seq cannot be negative"));
    }
    if threshold < 1 {
        return Err(Error::invalid_input("threshold must be at least 1"));
    }
    let n = u32::try_from(seq).map_err(|_| Error::invalid_input("seq too large"))?;

    let config = Config::builder().steal_policy(StealPolicy::Random).build()?;
    let pool = ForkJoinPool::new(config)?;

    let fib = pool.invoke(Fibonacci { n, threshold })?;
    println!("fib({}) = {}", n, fib);

    pool.shutdown();
    tracing::info!(executed = pool.stats().jobs_executed(), "pool terminated");
    Ok(())
}
