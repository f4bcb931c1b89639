//! Polar Construction Benchmarks
//!
//! Frozen-bit selection (sequential vs parallel bit-channel evaluation) and
//! factor graph sparsification.
//!
//! Run with: cargo bench -p polargraph-core --bench construction_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use polargraph_core::prelude::*;

/// Bit-channel error probabilities: sequential vs parallel
fn bench_frozen_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("frozen_selection");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);

    let channel = BmsChannel::bsc(0.11).unwrap();
    let mu = 16;

    for n in [6u32, 8, 10].iter() {
        group.throughput(Throughput::Elements(1u64 << n));

        let sequential = FrozenBitSelector::new(channel.clone(), *n, mu)
            .unwrap()
            .parallel(false);
        group.bench_with_input(BenchmarkId::new("sequential", n), &sequential, |b, s| {
            b.iter(|| s.select(black_box(FrozenCriterion::Rate(0.5))).unwrap())
        });

        let parallel = FrozenBitSelector::new(channel.clone(), *n, mu)
            .unwrap()
            .parallel(true);
        group.bench_with_input(BenchmarkId::new("parallel", n), &parallel, |b, s| {
            b.iter(|| s.select(black_box(FrozenCriterion::Rate(0.5))).unwrap())
        });
    }

    group.finish();
}

/// Degrading merge of a transformed channel with many symbols
fn bench_degrading_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("degrading_merge");

    let mut channel = BmsChannel::bsc(0.11).unwrap().degrading_merge(32).unwrap();
    channel = channel.arikan_transform2().degrading_merge(32).unwrap();
    let wide = channel.arikan_transform1();

    for mu in [8usize, 32, 128].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(mu), mu, |b, &mu| {
            b.iter(|| black_box(&wide).degrading_merge(mu).unwrap())
        });
    }

    group.finish();
}

/// Graph construction plus sparsification at rate 1/2
fn bench_sparsify(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparsify");
    group.sample_size(20);

    let channel = BmsChannel::bec(0.5).unwrap();
    for n in [6u32, 8, 10].iter() {
        let frozen = compute_frozen_indices(&channel, *n, 16, None, Some(0.5)).unwrap();
        group.throughput(Throughput::Elements(1u64 << n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &frozen, |b, frozen| {
            b.iter(|| {
                let mut graph = PolarFactorGraph::new(*n).unwrap();
                graph.set_frozen(frozen).unwrap();
                graph.sparsify().unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frozen_selection,
    bench_degrading_merge,
    bench_sparsify
);
criterion_main!(benches);
