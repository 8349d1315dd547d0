mod common;

use std::hint::black_box;

use assemblage::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

fn growth_iterations_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth/iterations");

    for &n in &[16usize, 64, 256] {
        group.throughput(common::elements_throughput(n));

        for (label, strategy) in [
            ("random", ReceiverSelection::Random),
            ("sequential", ReceiverSelection::Sequential),
            ("density", ReceiverSelection::Density),
        ] {
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, &n| {
                b.iter_batched(
                    || common::grid_engine(strategy, 0xC0FFEE),
                    |mut engine| {
                        let placed = engine.grow(n);
                        black_box(placed.len());
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

fn growth_rescan_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth/rescan");

    for &n in &[64usize, 256] {
        let mut grown = common::grid_engine(ReceiverSelection::Random, 0xFACEFEED);
        grown.grow(n);
        group.throughput(common::elements_throughput(grown.len()));

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                grown.rescan();
                black_box(grown.available().len());
            });
        });
    }

    group.finish();
}

fn growth_removal_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth/remove_and_regrow");
    let n = 128usize;

    group.bench_function(BenchmarkId::from_parameter(n), |b| {
        b.iter_batched(
            || {
                let mut engine = common::grid_engine(ReceiverSelection::Random, 0xBADC0DE);
                engine.grow(n);
                engine
            },
            |mut engine| {
                let last = engine.next_id() - 1;
                engine.remove(last);
                black_box(engine.update());
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = growth_iterations_benches,
              growth_rescan_benches,
              growth_removal_benches
}
criterion_main!(benches);
