//! Benchmarks comparing fork/join against sequential execution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use forkjoin::prelude::*;

struct Sum {
    start: u64,
    end: u64,
    threshold: u64,
}

impl RecursiveTask for Sum {
    type Output = u64;

    fn is_leaf(&self) -> bool {
        self.end - self.start < self.threshold
    }

    fn solve(&self) -> Result<u64> {
        Ok((self.start..=self.end).map(|x| black_box(x) % 7).sum())
    }

    fn split(&self) -> Vec<Self> {
        let middle = self.start + (self.end - self.start) / 2;
        vec![
            Sum {
                start: self.start,
                end: middle,
                threshold: self.threshold,
            },
            Sum {
                start: middle + 1,
                end: self.end,
                threshold: self.threshold,
            },
        ]
    }

    fn combine(&self, results: Vec<u64>) -> Result<u64> {
        Ok(results.into_iter().sum())
    }
}

fn sequential_sum(n: u64) -> u64 {
    (1..=n).map(|x| black_box(x) % 7).sum()
}

fn bench_sum(c: &mut Criterion) {
    let pool = ForkJoinPool::new(Config::default()).expect("Failed to create pool");

    let mut group = c.benchmark_group("sum");

    for size in [10_000u64, 100_000, 1_000_000].iter() {
        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, &size| {
            b.iter(|| sequential_sum(black_box(size)))
        });

        group.bench_with_input(BenchmarkId::new("fork_join", size), size, |b, &size| {
            b.iter(|| {
                pool.invoke(Sum {
                    start: 1,
                    end: black_box(size),
                    threshold: 4_096,
                })
                .unwrap()
            })
        });
    }

    group.finish();
    pool.shutdown();
}

// Granularity sweep: same input, different leaf sizes.
fn bench_threshold(c: &mut Criterion) {
    let pool = ForkJoinPool::new(Config::default()).expect("Failed to create pool");

    let mut group = c.benchmark_group("threshold");

    for threshold in [64u64, 1_024, 16_384, 262_144].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(threshold),
            threshold,
            |b, &threshold| {
                b.iter(|| {
                    pool.invoke(Sum {
                        start: 1,
                        end: 1_000_000,
                        threshold,
                    })
                    .unwrap()
                })
            },
        );
    }

    group.finish();
    pool.shutdown();
}

criterion_group!(benches, bench_sum, bench_threshold);
criterion_main!(benches);
