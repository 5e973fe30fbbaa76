//! Benchmarks for curve bootstrap and stretch evaluation.
//!
//! Run with: cargo bench -p knotwork-curves

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use knotwork_curves::prelude::*;

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

/// Deposits out to one year, then annual swaps out to `years`.
fn create_funding_specs(years: u32) -> Vec<StretchRepresentationSpec> {
    let deposits: Vec<SharedInstrument> = [(0.25, "3M"), (0.5, "6M"), (1.0, "1Y")]
        .iter()
        .map(|&(t, name)| Arc::new(Deposit::new(name, 0.0, t).unwrap()) as SharedInstrument)
        .collect();
    let deposit_quotes = vec![0.030, 0.031, 0.032];

    let swaps: Vec<SharedInstrument> = (2..=years)
        .map(|y| {
            Arc::new(FixFloatSwap::new(format!("{y}Y"), 0.0, f64::from(y), 1, 2).unwrap())
                as SharedInstrument
        })
        .collect();
    let swap_quotes: Vec<f64> = (2..=years)
        .map(|y| 0.032 + 0.012 * (1.0 - (-f64::from(y) / 8.0).exp()))
        .collect();
    let swap_measures = vec![ManifestMeasure::SwapRate; swap_quotes.len()];

    vec![
        StretchRepresentationSpec::new(
            "money-market",
            LatentState::Funding,
            QuantificationMetric::DiscountFactor,
            deposits,
            vec![ManifestMeasure::Rate; 3],
            deposit_quotes,
        )
        .unwrap(),
        StretchRepresentationSpec::new(
            "swaps",
            LatentState::Funding,
            QuantificationMetric::DiscountFactor,
            swaps,
            swap_measures,
            swap_quotes,
        )
        .unwrap(),
    ]
}

// =============================================================================
// BOOTSTRAP BENCHMARKS
// =============================================================================

fn bench_bootstrap(c: &mut Criterion) {
    let calibrator = LinearCurveCalibrator::default();
    let valuation = ValuationParams::default();
    let market = MarketParams::new();

    let mut group = c.benchmark_group("bootstrap");
    group.sample_size(20);

    for years in [5u32, 10, 30].iter() {
        let specs = create_funding_specs(*years);
        let instruments: usize = specs.iter().map(StretchRepresentationSpec::len).sum();

        group.throughput(Throughput::Elements(instruments as u64));
        group.bench_with_input(BenchmarkId::from_parameter(years), &specs, |b, specs| {
            b.iter(|| calibrator.calibrate(black_box(specs), &valuation, &market))
        });
    }
    group.finish();
}

fn bench_calibrate_independent(c: &mut Criterion) {
    let calibrator = LinearCurveCalibrator::default();
    let jobs: Vec<CalibrationJob> = (0..8)
        .map(|_| {
            CalibrationJob::new(
                create_funding_specs(10),
                ValuationParams::default(),
                MarketParams::new(),
            )
        })
        .collect();

    let mut group = c.benchmark_group("calibrate_independent");
    group.sample_size(10);
    group.throughput(Throughput::Elements(jobs.len() as u64));
    group.bench_function("8_curves", |b| {
        b.iter(|| calibrator.calibrate_independent(black_box(&jobs)))
    });
    group.finish();
}

// =============================================================================
// CURVE OPERATIONS BENCHMARKS
// =============================================================================

fn bench_curve_evaluation(c: &mut Criterion) {
    let curve = LinearCurveCalibrator::default()
        .calibrate(
            &create_funding_specs(30),
            &ValuationParams::default(),
            &MarketParams::new(),
        )
        .unwrap();

    let mut group = c.benchmark_group("curve_operations");

    group.bench_function("discount_factor_single", |b| {
        b.iter(|| curve.discount_factor(black_box(7.3)))
    });

    let tenors: Vec<f64> = (1..=100).map(|i| f64::from(i) * 0.3).collect();
    group.bench_function("discount_factor_100_tenors", |b| {
        b.iter(|| {
            tenors
                .iter()
                .map(|&t| curve.discount_factor(black_box(t)))
                .collect::<Vec<_>>()
        })
    });

    group.bench_function("forward_rate_1y", |b| {
        b.iter(|| curve.forward_rate(black_box(9.0), black_box(10.0)))
    });
    group.finish();
}

criterion_group!(bootstrap, bench_bootstrap, bench_calibrate_independent);

criterion_group!(curve_ops, bench_curve_evaluation);

criterion_main!(bootstrap, curve_ops);
