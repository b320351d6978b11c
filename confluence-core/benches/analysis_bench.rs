//! Criterion benchmarks for the evaluation hot paths.
//!
//! Benchmarks:
//! 1. Indicator series (EMA, StochRSI bands, swing scan)
//! 2. Single-timeframe analysis
//! 3. Evaluation of a ready view
//! 4. Full simulator run (as-of views rebuilt per driver bar)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use confluence_core::analysis::{analyze, AnalysisConfig};
use confluence_core::backtest::{BacktestConfig, SimulationData, Simulator};
use confluence_core::domain::{resample, Candle, CandleSeries, Timeframe};
use confluence_core::indicators::{Ema, Indicator, StochRsi, StochRsiParams, Swing};
use confluence_core::strategy::{evaluate, MarketView, ProfileKind, StrategyProfile};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_m15(n: usize) -> Vec<Candle> {
    let base = chrono::DateTime::from_timestamp(1_704_067_200, 0).unwrap();
    let mut prev = 100.0;
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + 0.01 * x + (x * 0.05).sin() * 3.0 + (x * 0.7).sin() * 0.4;
            let open = (prev + close) / 2.0;
            prev = close;
            Candle::new(
                base + chrono::Duration::minutes(15 * i as i64),
                open,
                open.max(close) + 0.2,
                open.min(close) - 0.2,
                close,
                1_000.0,
            )
        })
        .collect()
}

fn make_data(m15: Vec<Candle>) -> SimulationData {
    let h1 = resample(&m15, Timeframe::M15, Timeframe::H1);
    let h4 = resample(&m15, Timeframe::M15, Timeframe::H4);
    let series = [(Timeframe::M15, m15), (Timeframe::H1, h1), (Timeframe::H4, h4)]
        .into_iter()
        .map(|(tf, candles)| CandleSeries::sanitize(tf, candles).unwrap().0);
    SimulationData::from_series("BENCH", series)
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_series");

    for &count in &[500, 2_000, 10_000] {
        let candles = make_m15(count);
        let stack: Vec<Box<dyn Indicator>> = vec![
            Box::new(Ema::new(21)),
            Box::new(Ema::new(200)),
            Box::new(StochRsi::k(StochRsiParams::default())),
            Box::new(StochRsi::d(StochRsiParams::default())),
            Box::new(Swing::high(20)),
            Box::new(Swing::low(20)),
        ];
        group.bench_with_input(BenchmarkId::new("analysis_stack", count), &count, |b, _| {
            b.iter(|| {
                for ind in &stack {
                    black_box(ind.compute(black_box(&candles)));
                }
            });
        });
    }

    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let cfg = AnalysisConfig::default();

    for &count in &[250, 1_000, 5_000] {
        let candles = make_m15(count);
        group.bench_with_input(BenchmarkId::new("m15", count), &count, |b, _| {
            b.iter(|| analyze(black_box(&candles), Timeframe::M15, black_box(&cfg)));
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let cfg = AnalysisConfig::default();
    let data = make_data(make_m15(16 * 300));
    let view = MarketView::analyze(
        [Timeframe::M15, Timeframe::H1, Timeframe::H4]
            .into_iter()
            .filter_map(|tf| data.series(tf).map(|s| (tf, s.candles()))),
        &cfg,
    );

    for kind in ProfileKind::ALL {
        let profile = StrategyProfile::builtin(kind);
        group.bench_function(kind.as_str(), |b| {
            b.iter(|| evaluate(black_box(&view), black_box(&profile)));
        });
    }

    group.finish();
}

fn bench_simulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator");
    group.sample_size(10);

    for &h4_bars in &[100, 300] {
        let data = make_data(make_m15(16 * h4_bars));
        let sim = Simulator::new(
            StrategyProfile::builtin(ProfileKind::Medium),
            AnalysisConfig::default(),
            BacktestConfig::default(),
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::new("medium", h4_bars), &h4_bars, |b, _| {
            b.iter(|| sim.run(black_box(&data)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_indicators,
    bench_analyze,
    bench_evaluate,
    bench_simulator,
);
criterion_main!(benches);
