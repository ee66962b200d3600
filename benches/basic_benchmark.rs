//! Core pipeline benchmarks: group-by, join and sort over random frames

use criterion::{criterion_group, criterion_main, Criterion};
use facet::{col, DataFrame, JoinType, Series};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

fn random_frame(rows: usize, cardinality: i64, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let keys: Vec<i64> = (0..rows).map(|_| rng.random_range(0..cardinality)).collect();
    let values: Vec<f64> = (0..rows).map(|_| rng.random::<f64>() * 100.0).collect();
    DataFrame::new(vec![
        Series::new("k", keys),
        Series::new("v", values),
    ])
    .unwrap()
}

fn bench_group_by_sum(c: &mut Criterion) {
    let df = random_frame(1_000_000, 1_000, 1);
    c.bench_function("group_by_sum_1m_rows_1k_groups", |b| {
        b.iter(|| {
            let out = df
                .group_by(&["k"])
                .unwrap()
                .agg(&[col("v").sum().alias("total")])
                .unwrap();
            black_box(out)
        })
    });
}

fn bench_inner_join(c: &mut Criterion) {
    let left = random_frame(500_000, 10_000, 2);
    let right = random_frame(50_000, 10_000, 3);
    c.bench_function("inner_join_500k_x_50k", |b| {
        b.iter(|| {
            let out = left.join(&right, &["k"], &["k"], JoinType::Inner).unwrap();
            black_box(out)
        })
    });
}

fn bench_sort(c: &mut Criterion) {
    let df = random_frame(1_000_000, i64::MAX, 4);
    c.bench_function("sort_1m_rows", |b| {
        b.iter(|| {
            let out = df.sort(&["k"], &[false]).unwrap();
            black_box(out)
        })
    });
}

criterion_group!(benches, bench_group_by_sum, bench_inner_join, bench_sort);
criterion_main!(benches);
