//! Pool selection and feedback overhead under various pool shapes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gateway_pool::{new_credential, Pool, PoolConfig, SelectOutcome, SelectionStrategy};

fn pool_with(n: usize, strategy: SelectionStrategy) -> Pool {
    let mut pool = Pool::new(strategy, PoolConfig::default());
    for i in 0..n {
        pool.push(new_credential(i, format!("sk-{i}"), 64, 100.0, 20.0, 50.0, 64));
    }
    pool
}

fn bench_select_among_healthy(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_among_healthy");
    for &n in &[1usize, 4, 16, 64] {
        group.bench_function(format!("balanced_{n}"), |b| {
            let mut pool = pool_with(n, SelectionStrategy::Balanced);
            b.iter(|| {
                let outcome = pool.select();
                if let SelectOutcome::Selected(index) = outcome {
                    pool.record_success(index, 20.0);
                }
                black_box(outcome)
            });
        });
    }
    group.finish();
}

fn bench_select_round_robin(c: &mut Criterion) {
    c.bench_function("select_round_robin_16", |b| {
        let mut pool = pool_with(16, SelectionStrategy::RoundRobin);
        b.iter(|| {
            let outcome = pool.select();
            if let SelectOutcome::Selected(index) = outcome {
                pool.record_success(index, 20.0);
            }
            black_box(outcome)
        });
    });
}

fn bench_select_with_failures_mixed_in(c: &mut Criterion) {
    c.bench_function("select_with_one_in_five_failing", |b| {
        let mut pool = pool_with(16, SelectionStrategy::Balanced);
        let mut call = 0u64;
        b.iter(|| {
            let outcome = pool.select();
            if let SelectOutcome::Selected(index) = outcome {
                call += 1;
                if call % 5 == 0 {
                    pool.record_failure(index, 50.0, false);
                } else {
                    pool.record_success(index, 20.0);
                }
            }
            black_box(outcome)
        });
    });
}

fn bench_select_cold_pool(c: &mut Criterion) {
    c.bench_function("select_all_circuits_open", |b| {
        let mut pool = pool_with(16, SelectionStrategy::Balanced);
        for i in 0..16 {
            pool.force_open(i);
        }
        b.iter(|| black_box(pool.select()));
    });
}

criterion_group!(
    pool_selection_benches,
    bench_select_among_healthy,
    bench_select_round_robin,
    bench_select_with_failures_mixed_in,
    bench_select_cold_pool,
);

criterion_main!(pool_selection_benches);
