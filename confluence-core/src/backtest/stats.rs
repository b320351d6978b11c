//! Summary statistics in R — pure functions over the closed-trade ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ClosedTrade, TradeId};

/// One point per closed trade: cumulative R after that trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPoint {
    pub trade_id: TradeId,
    pub time: DateTime<Utc>,
    pub equity_r: f64,
    pub drawdown_r: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestStats {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub average_r: f64,
    pub total_r: f64,
    pub average_win_r: f64,
    pub average_loss_r: f64,
    /// Gross win R over gross loss R; 0 when there are no losses.
    pub profit_factor: f64,
    pub max_drawdown_r: f64,
    pub expectancy_r: f64,
    pub largest_win_r: f64,
    pub largest_loss_r: f64,
    pub max_consecutive_losses: usize,
}

impl BacktestStats {
    pub fn compute(trades: &[ClosedTrade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let curve = equity_curve(trades);
        let total_r = total_r(trades);
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.r_multiple).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| t.is_loser()).map(|t| t.r_multiple).collect();
        let gross_win: f64 = wins.iter().sum();
        let gross_loss: f64 = -losses.iter().sum::<f64>();
        let average_r = total_r / trades.len() as f64;

        Self {
            trade_count: trades.len(),
            wins: wins.len(),
            losses: losses.len(),
            win_rate: wins.len() as f64 / trades.len() as f64,
            average_r,
            total_r,
            average_win_r: mean(&wins),
            average_loss_r: mean(&losses),
            profit_factor: if gross_loss > 0.0 { gross_win / gross_loss } else { 0.0 },
            max_drawdown_r: curve.iter().map(|p| p.drawdown_r).fold(0.0, f64::max),
            expectancy_r: average_r,
            largest_win_r: wins.iter().copied().fold(0.0, f64::max),
            largest_loss_r: losses.iter().copied().fold(0.0, f64::min),
            max_consecutive_losses: max_consecutive_losses(trades),
        }
    }
}

/// Sum of R in ledger order. The equity curve accumulates in the same order,
/// so its last point equals this value exactly.
pub fn total_r(trades: &[ClosedTrade]) -> f64 {
    trades.iter().fold(0.0, |acc, t| acc + t.r_multiple)
}

pub fn equity_curve(trades: &[ClosedTrade]) -> Vec<EquityPoint> {
    let mut equity = 0.0_f64;
    let mut peak = 0.0_f64;
    trades
        .iter()
        .map(|t| {
            equity += t.r_multiple;
            peak = peak.max(equity);
            EquityPoint {
                trade_id: t.trade.id,
                time: t.exit_time,
                equity_r: equity,
                drawdown_r: peak - equity,
            }
        })
        .collect()
}

pub fn max_consecutive_losses(trades: &[ClosedTrade]) -> usize {
    let mut max_run = 0;
    let mut run = 0;
    for t in trades {
        if t.is_loser() {
            run += 1;
            max_run = max_run.max(run);
        } else {
            run = 0;
        }
    }
    max_run
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
