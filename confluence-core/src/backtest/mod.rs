//! Backtest simulator — deterministic replay of the evaluator over history.

pub mod config;
pub mod data;
pub mod error;
pub mod simulator;
pub mod stats;

pub use config::BacktestConfig;
pub use data::{visible_at, SimulationData};
pub use error::{BacktestError, SkipKind, SkippedStep};
pub use simulator::{check_entry_tolerance, check_exit, targets_from_fill, Simulator};
pub use stats::{BacktestStats, EquityPoint};

use serde::{Deserialize, Serialize};

use crate::domain::{ClosedTrade, RejectedCandle, Timeframe};

/// Outcome of one simulator run. The trade ledger is in close order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub symbol: String,
    pub profile: String,
    pub driver_timeframe: Timeframe,
    pub config: BacktestConfig,
    pub bars_total: usize,
    pub warmup_bars: usize,
    pub bars_evaluated: usize,
    pub signals_valid: usize,
    pub trades: Vec<ClosedTrade>,
    pub stats: BacktestStats,
    pub equity_curve: Vec<EquityPoint>,
    pub skipped: Vec<SkippedStep>,
    pub rejected_candles: Vec<RejectedCandle>,
}
