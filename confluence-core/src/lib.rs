//! Confluence Core — multi-timeframe signal evaluation and as-of backtesting.
//!
//! This crate contains:
//! - Domain types (candles, validated series, timeframes, sides, trades)
//! - Series indicators behind a look-ahead-checked `Indicator` trait
//! - Per-timeframe analysis producing immutable `TimeframeAnalysis` snapshots
//! - Confluence scoring with itemized contributions
//! - Profile-driven strategy evaluation producing `Signal`s
//! - A single-position simulator that replays evaluation over history
//!
//! No I/O happens here. Loading candles and writing results belongs to the
//! runner.

pub mod analysis;
pub mod backtest;
pub mod domain;
pub mod indicators;
pub mod scoring;
pub mod strategy;

pub use analysis::{analyze, AnalysisConfig, TimeframeAnalysis};
pub use backtest::{BacktestConfig, BacktestResult, SimulationData, Simulator};
pub use domain::{Candle, CandleSeries, Direction, Side, Timeframe};
pub use strategy::{evaluate, MarketView, ProfileKind, Session, Signal, StrategyProfile};
