//! Indicator engine: candle history → `TimeframeAnalysis`.
//!
//! Everything here is recomputed from scratch for each window. Nothing is
//! cached between calls, so an analysis can only see the candles it was given.

pub mod classify;
pub mod config;
pub mod engine;

pub use classify::{OscillatorDirection, OscillatorZone, PullbackState, Trend};
pub use config::{AnalysisConfig, AnalysisConfigError, DEFAULT_ENTRY_TOLERANCE_PCT};
pub use engine::{analyze, AnalysisError, TimeframeAnalysis};
