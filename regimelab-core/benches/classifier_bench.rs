//! Criterion benchmarks for classification hot paths.
//!
//! Benchmarks:
//! 1. RegimeClassifier::classify across lookbacks
//! 2. Full six-layer aggregation on synthetic data
//! 3. Pair statistics (Engle-Granger) on aligned series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use regimelab_core::data::{StandardCalendar, SyntheticProvider, Universe};
use regimelab_core::detectors::PairStatistics;
use regimelab_core::domain::{closes, LayerKind};
use regimelab_core::{HierarchyConfig, LayerAggregator, RegimeClassifier};

fn provider() -> SyntheticProvider {
    SyntheticProvider::new(
        Universe::default_us(),
        chrono::NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        500,
    )
}

fn bench_classify(c: &mut Criterion) {
    let series = provider().generate("NVDA");
    let classifier = RegimeClassifier::default();
    let mut group = c.benchmark_group("classify");
    for lookback in [20usize, 60, 120, 250] {
        group.bench_with_input(BenchmarkId::from_parameter(lookback), &lookback, |b, &lb| {
            b.iter(|| {
                classifier
                    .classify(LayerKind::Instrument, black_box(&series), lb)
                    .ok()
            })
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let aggregator = LayerAggregator::new(
        Arc::new(provider()),
        Arc::new(StandardCalendar::new()),
        RegimeClassifier::default(),
        HierarchyConfig::default(),
    );
    c.bench_function("aggregate_hierarchy", |b| {
        b.iter(|| aggregator.aggregate(black_box("AAPL")).ok())
    });
}

fn bench_pair_statistics(c: &mut Criterion) {
    let p = provider();
    let a = closes(&p.generate("XOM"));
    let b = closes(&p.generate("CVX"));
    c.bench_function("pair_statistics_500", |bench| {
        bench.iter(|| PairStatistics::compute(black_box(&a), black_box(&b)))
    });
}

criterion_group!(benches, bench_classify, bench_aggregate, bench_pair_statistics);
criterion_main!(benches);
