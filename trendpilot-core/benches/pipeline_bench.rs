//! Criterion benchmarks for the per-cycle recomputation.
//!
//! Benchmarks:
//! 1. Indicator stack on the 1h history
//! 2. Full pipeline (indicators → fusion → signals)

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trendpilot_core::domain::Bar;
use trendpilot_core::indicators::{AdxWilder, Atr, Cmo, Indicator, Tema};
use trendpilot_core::params::StrategyParams;
use trendpilot_core::signal::compute_signals;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize, step_hours: i64) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.05;
            Bar {
                timestamp: base + Duration::hours(i as i64 * step_hours),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000.0 + (i % 500) as f64,
            }
        })
        .collect()
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");

    for &bar_count in &[300, 1200] {
        let bars = make_bars(bar_count, 1);
        let stack: Vec<Box<dyn Indicator>> = vec![
            Box::new(Tema::new(10)),
            Box::new(Tema::new(80)),
            Box::new(AdxWilder::new(14)),
            Box::new(Cmo::new(14)),
            Box::new(Atr::new(14)),
        ];
        group.bench_with_input(BenchmarkId::new("stack_5", bar_count), &bar_count, |b, _| {
            b.iter(|| {
                for ind in &stack {
                    black_box(ind.compute(black_box(&bars)));
                }
            });
        });
    }

    group.finish();
}

// ── 2. Full pipeline ─────────────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let params = StrategyParams::default();
    let bars_1h = make_bars(300, 1);
    let bars_4h = make_bars(300, 4);

    group.bench_function("signals_300x300", |b| {
        b.iter(|| compute_signals(black_box(&bars_1h), black_box(&bars_4h), black_box(&params)));
    });

    group.finish();
}

criterion_group!(benches, bench_indicators, bench_pipeline);
criterion_main!(benches);
