//! Trade lifecycle for the single-position simulator.
//!
//! A `Trade` is opened from a valid signal and becomes a `ClosedTrade` exactly
//! once: on a stop-loss hit, a take-profit hit, or the forced close at the end
//! of data. Every P/L figure is expressed in R (multiples of the initial risk).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::direction::Side;
use super::ids::TradeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitType {
    StopLoss,
    TakeProfit,
    ForcedClose,
}

impl ExitType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopLoss => "STOP_LOSS",
            Self::TakeProfit => "TAKE_PROFIT",
            Self::ForcedClose => "FORCED_CLOSE",
        }
    }
}

/// Geometry problems that prevent a trade from being opened.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("non-finite trade level (entry {entry}, stop {stop})")]
    NonFinite { entry: f64, stop: f64 },
    #[error("zero risk: stop equals entry {entry}")]
    ZeroRisk { entry: f64 },
    #[error("{side} stop {stop} is not on the loss side of entry {entry}")]
    StopOnWrongSide { side: Side, stop: f64, entry: f64 },
    #[error("trade has no profit targets")]
    NoTargets,
    #[error("{side} target {target} is not on the profit side of entry {entry}")]
    TargetBehindEntry { side: Side, target: f64, entry: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: TradeId,
    pub direction: Side,
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub targets: Vec<f64>,
    /// `|entry_price - stop_loss|`; normalizes every R figure for this trade.
    pub risk_amount: f64,
    pub confidence: f64,
    pub state: TradeState,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: TradeId,
        direction: Side,
        entry_bar: usize,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        stop_loss: f64,
        targets: Vec<f64>,
        confidence: f64,
    ) -> Result<Self, TradeError> {
        if !entry_price.is_finite() || !stop_loss.is_finite() {
            return Err(TradeError::NonFinite {
                entry: entry_price,
                stop: stop_loss,
            });
        }
        let risk_amount = (entry_price - stop_loss).abs();
        if risk_amount == 0.0 {
            return Err(TradeError::ZeroRisk { entry: entry_price });
        }
        if direction.sign() * (entry_price - stop_loss) < 0.0 {
            return Err(TradeError::StopOnWrongSide {
                side: direction,
                stop: stop_loss,
                entry: entry_price,
            });
        }
        if targets.is_empty() {
            return Err(TradeError::NoTargets);
        }
        if let Some(&target) = targets
            .iter()
            .find(|&&t| !(direction.sign() * (t - entry_price) > 0.0))
        {
            return Err(TradeError::TargetBehindEntry {
                side: direction,
                target,
                entry: entry_price,
            });
        }

        Ok(Self {
            id,
            direction,
            entry_bar,
            entry_time,
            entry_price,
            stop_loss,
            targets,
            risk_amount,
            confidence,
            state: TradeState::Open,
        })
    }

    /// Result of exiting at `price`, in R.
    pub fn r_multiple_at(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) / self.risk_amount
    }

    /// Target used for the take-profit exit. Out-of-range indices clamp to the
    /// last target; `None` only for a trade carrying no targets.
    pub fn exit_target(&self, index: usize) -> Option<f64> {
        let last = self.targets.len().checked_sub(1)?;
        self.targets.get(index.min(last)).copied()
    }

    /// Close on a stop-loss or take-profit fill at `exit_price`.
    pub fn close(
        mut self,
        exit_bar: usize,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        exit_type: ExitType,
    ) -> ClosedTrade {
        let r_multiple = match exit_type {
            ExitType::ForcedClose => 0.0,
            ExitType::StopLoss | ExitType::TakeProfit => self.r_multiple_at(exit_price),
        };
        self.state = TradeState::Closed;
        ClosedTrade {
            bars_held: exit_bar.saturating_sub(self.entry_bar),
            trade: self,
            exit_bar,
            exit_time,
            exit_price,
            exit_type,
            r_multiple,
        }
    }

    /// End-of-data close. Booked at R = 0 regardless of the last price.
    pub fn force_close(
        self,
        exit_bar: usize,
        exit_time: DateTime<Utc>,
        last_price: f64,
    ) -> ClosedTrade {
        self.close(exit_bar, exit_time, last_price, ExitType::ForcedClose)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTrade {
    #[serde(flatten)]
    pub trade: Trade,
    pub exit_bar: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_type: ExitType,
    pub r_multiple: f64,
    pub bars_held: usize,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.r_multiple > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.r_multiple < 0.0
    }
}
