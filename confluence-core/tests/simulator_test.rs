//! End-to-end simulator runs on synthetic 1h data.
//!
//! The price path is a rising line with a sine wave on top, so swing pivots
//! exist and each dip bottoms out higher than the one before.

use std::sync::atomic::AtomicBool;

use chrono::{Duration, TimeZone, Utc};
use confluence_core::analysis::AnalysisConfig;
use confluence_core::backtest::{
    BacktestConfig, BacktestError, SimulationData, Simulator, SkipKind,
};
use confluence_core::domain::{Candle, CandleSeries, ExitType, Side, Timeframe};
use confluence_core::strategy::{evaluate, ProfileConfig, ProfileKind, StrategyProfile};

fn wave_h1(n: usize) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let close_at = |i: usize| {
        let x = i as f64;
        100.0 + 0.3 * x + 2.0 * (0.7 * x).sin()
    };
    (0..n)
        .map(|i| {
            let close = close_at(i);
            let prev = if i == 0 { close } else { close_at(i - 1) };
            let open = (prev + close) / 2.0;
            Candle::new(
                base + Duration::hours(i as i64),
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
                1000.0,
            )
        })
        .collect()
}

fn h1_data(n: usize) -> SimulationData {
    let series = CandleSeries::sanitize(Timeframe::H1, wave_h1(n)).unwrap().0;
    SimulationData::from_series("WAVE", [series])
}

fn h1_profile(targets: Vec<f64>) -> StrategyProfile {
    StrategyProfile::try_from(ProfileConfig {
        name: "h1-wave".into(),
        anchor_timeframes: vec![Timeframe::H1],
        confirm_timeframes: vec![],
        entry_timeframes: vec![],
        min_confidence: 0.3,
        risk_reward_targets: targets,
        stop_loss_timeframe: Timeframe::H1,
        entry_tolerance_pct: Some(0.01),
        weights: Default::default(),
    })
    .unwrap()
}

fn analysis() -> AnalysisConfig {
    AnalysisConfig {
        ema_fast_period: 5,
        ema_slow_period: 20,
        swing_lookback: 10,
        slope_lookback: 1,
        entry_tolerance_pct: 0.01,
        overextended_multiplier: 5.0,
        ..Default::default()
    }
}

fn simulator(targets: Vec<f64>) -> Simulator {
    Simulator::new(h1_profile(targets), analysis(), BacktestConfig::default()).unwrap()
}

#[test]
fn wave_uptrend_produces_long_trades() {
    let result = simulator(vec![1.0, 2.0]).run(&h1_data(200)).unwrap();

    assert!(!result.trades.is_empty(), "no trades: {:?}", result.stats);
    assert!(result.trades.iter().all(|t| t.trade.direction == Side::Long));
    assert_eq!(result.driver_timeframe, Timeframe::H1);
    assert_eq!(result.bars_total, 200);
    assert_eq!(result.warmup_bars, 4);
    assert!(result.signals_valid >= result.trades.len());
    assert_eq!(result.stats.trade_count, result.trades.len());
    assert!(result.skipped.is_empty());

    for t in &result.trades {
        match t.exit_type {
            ExitType::StopLoss => assert!((t.r_multiple + 1.0).abs() < 1e-9),
            ExitType::TakeProfit => assert!((t.r_multiple - 1.0).abs() < 1e-9),
            ExitType::ForcedClose => assert_eq!(t.r_multiple, 0.0),
        }
        assert!(t.trade.stop_loss < t.trade.entry_price);
    }
}

#[test]
fn unreachable_target_is_force_closed_at_zero_r() {
    let data = h1_data(200);
    let result = simulator(vec![50.0]).run(&data).unwrap();

    assert_eq!(result.trades.len(), 1, "{:?}", result.trades);
    let only = &result.trades[0];
    assert_eq!(only.exit_type, ExitType::ForcedClose);
    assert_eq!(only.exit_bar, 199);
    assert_eq!(only.r_multiple, 0.0);
    assert_eq!(only.exit_price, data.series(Timeframe::H1).unwrap().candles()[199].close);
    assert_eq!(result.stats.total_r, 0.0);
}

#[test]
fn later_exit_target_waits_longer() {
    let data = h1_data(200);
    let profile = h1_profile(vec![1.0, 2.0]);
    let first = Simulator::new(profile.clone(), analysis(), BacktestConfig::default())
        .unwrap()
        .run(&data)
        .unwrap();
    let second = Simulator::new(
        profile,
        analysis(),
        BacktestConfig {
            exit_target: 2,
            ..Default::default()
        },
    )
    .unwrap()
    .run(&data)
    .unwrap();

    let first_trade = &first.trades[0];
    let second_trade = &second.trades[0];
    assert_eq!(first_trade.trade.entry_bar, second_trade.trade.entry_bar);
    assert!(second_trade.exit_bar >= first_trade.exit_bar);
    assert!(second
        .trades
        .iter()
        .filter(|t| t.exit_type == ExitType::TakeProfit)
        .all(|t| (t.r_multiple - 2.0).abs() < 1e-9));
}

#[test]
fn runs_are_deterministic() {
    let data = h1_data(200);
    let sim = simulator(vec![1.0, 2.0]);
    let a = sim.run(&data).unwrap();
    let b = sim.run(&data).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn cancellation_stops_at_first_evaluated_bar() {
    let cancel = AtomicBool::new(true);
    let err = simulator(vec![1.0])
        .run_with_cancel(&h1_data(50), &cancel)
        .unwrap_err();
    assert_eq!(err, BacktestError::Cancelled { bar: 4 });
}

#[test]
fn missing_profile_timeframe_is_an_error() {
    let sim = Simulator::new(
        StrategyProfile::builtin(ProfileKind::Medium),
        AnalysisConfig::default(),
        BacktestConfig::default(),
    )
    .unwrap();
    let err = sim.run(&h1_data(50)).unwrap_err();
    assert_eq!(
        err,
        BacktestError::MissingTimeframe {
            symbol: "WAVE".into(),
            profile: "medium".into(),
            timeframe: Timeframe::M15,
        }
    );
}

#[test]
fn short_data_yields_empty_ledger() {
    let result = simulator(vec![1.0]).run(&h1_data(3)).unwrap();
    assert!(result.trades.is_empty());
    assert_eq!(result.bars_evaluated, 0);
    assert_eq!(result.stats.trade_count, 0);
    assert!(result.equity_curve.is_empty());
}

#[test]
fn result_json_is_camel_case() {
    let result = simulator(vec![1.0, 2.0]).run(&h1_data(120)).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["driverTimeframe"], "1h");
    assert!(json["stats"]["winRate"].is_number());
    assert!(json["equityCurve"].is_array());
    assert!(json["rejectedCandles"].as_array().unwrap().is_empty());
}

/// Flat 4h candles pinned above the 1h wave: the 4h anchor never trends, so
/// the 1h fallback anchor fires and prices its levels off a 1h close.
fn flat_h4_over_wave(h4_bars: usize, level: f64) -> SimulationData {
    let base = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let h4: Vec<Candle> = (0..h4_bars)
        .map(|i| {
            Candle::new(
                base + Duration::hours(4 * i as i64),
                level,
                level + 0.5,
                level - 0.5,
                level,
                1000.0,
            )
        })
        .collect();
    let h4 = CandleSeries::sanitize(Timeframe::H4, h4).unwrap().0;
    let h1 = CandleSeries::sanitize(Timeframe::H1, wave_h1(4 * h4_bars)).unwrap().0;
    SimulationData::from_series("WAVE", [h4, h1])
}

#[test]
fn fallback_anchor_targets_are_measured_from_the_fill() {
    let multiples = vec![1.0, 2.0];
    let profile = StrategyProfile::try_from(ProfileConfig {
        name: "h4-h1".into(),
        anchor_timeframes: vec![Timeframe::H4, Timeframe::H1],
        risk_reward_targets: multiples.clone(),
        ..h1_profile(vec![1.0]).to_config()
    })
    .unwrap();
    let data = flat_h4_over_wave(40, 160.0);
    let result = Simulator::new(profile.clone(), analysis(), BacktestConfig::default())
        .unwrap()
        .run(&data)
        .unwrap();

    assert_eq!(result.driver_timeframe, Timeframe::H4);
    assert!(!result.trades.is_empty(), "skipped: {:?}", result.skipped);
    assert!(result
        .skipped
        .iter()
        .all(|s| s.kind != SkipKind::TradeGeometry));

    for t in &result.trades {
        let trade = &t.trade;
        assert_eq!(trade.entry_price, 160.0);
        assert_eq!(trade.targets.len(), multiples.len());
        for (target, r) in trade.targets.iter().zip(&multiples) {
            assert!((trade.r_multiple_at(*target) - r).abs() < 1e-9, "{trade:?}");
        }

        let view = data.view_at(&profile.timeframes(), Timeframe::H4, trade.entry_time, &analysis());
        let signal = evaluate(&view, &profile);
        assert_eq!(signal.anchor_timeframe, Some(Timeframe::H1));
        assert_ne!(signal.entry_price, Some(trade.entry_price));
    }
}
