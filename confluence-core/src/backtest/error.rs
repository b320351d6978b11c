//! Backtest errors and per-bar skip records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::AnalysisConfigError;
use crate::domain::{SeriesError, Timeframe};

/// Failures that stop a whole run. Problems confined to one bar become
/// [`SkippedStep`]s instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("{symbol}: profile '{profile}' needs {timeframe} candles, none supplied")]
    MissingTimeframe {
        symbol: String,
        profile: String,
        timeframe: Timeframe,
    },
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    AnalysisConfig(#[from] AnalysisConfigError),
    #[error("exit_target must be >= 1 (tp1), got {0}")]
    ExitTarget(usize),
    #[error(
        "profile '{profile}' entry_tolerance_pct {profile_pct} differs from analysis entry_tolerance_pct {analysis_pct}"
    )]
    ToleranceMismatch {
        profile: String,
        profile_pct: f64,
        analysis_pct: f64,
    },
    #[error("backtest cancelled at bar {bar}")]
    Cancelled { bar: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipKind {
    /// A valid signal whose levels could not form a trade at the bar close.
    TradeGeometry,
    /// A referenced timeframe could not be analyzed.
    AnalysisFailed,
}

/// A driver bar the simulator could not process normally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedStep {
    pub bar: usize,
    pub timestamp: DateTime<Utc>,
    pub kind: SkipKind,
    pub detail: String,
}
