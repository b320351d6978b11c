//! Swing structure: the most extreme pivot high / pivot low in a trailing window.
//!
//! A pivot high at j has `high[j] > high[j-1]` and `high[j] > high[j+1]`
//! (mirrored for lows). Evaluated at t, only pivots with `j + 1 <= t` count,
//! so the candle at t never qualifies and nothing after t is read.
//! The window is the last `lookback` candles ending at t.

use serde::{Deserialize, Serialize};

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone)]
pub struct Swing {
    lookback: usize,
    kind: SwingKind,
    name: String,
}

impl Swing {
    pub fn new(lookback: usize, kind: SwingKind) -> Self {
        assert!(lookback >= 3, "swing lookback must be >= 3");
        let kind_str = match kind {
            SwingKind::High => "high",
            SwingKind::Low => "low",
        };
        Self {
            lookback,
            kind,
            name: format!("swing_{kind_str}_{lookback}"),
        }
    }

    pub fn high(lookback: usize) -> Self {
        Self::new(lookback, SwingKind::High)
    }

    pub fn low(lookback: usize) -> Self {
        Self::new(lookback, SwingKind::Low)
    }
}

impl Indicator for Swing {
    fn name(&self) -> &str {
        &self.name
    }

    /// Earliest index at which a pivot can exist (pivot at 1, confirmed at 2).
    fn lookback(&self) -> usize {
        2
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        (0..candles.len())
            .map(|t| swing_at(candles, t, self.lookback, self.kind).unwrap_or(f64::NAN))
            .collect()
    }

    fn latest(&self, candles: &[Candle]) -> Option<f64> {
        candles
            .len()
            .checked_sub(1)
            .and_then(|t| swing_at(candles, t, self.lookback, self.kind))
    }
}

/// Swing level as of candle `t`, or `None` when no pivot lies in the window.
pub fn swing_at(candles: &[Candle], t: usize, lookback: usize, kind: SwingKind) -> Option<f64> {
    if t >= candles.len() || t < 2 || lookback == 0 {
        return None;
    }
    let start = (t + 1).saturating_sub(lookback).max(1);

    let mut best: Option<f64> = None;
    for j in start..t {
        let (prev, here, next) = match kind {
            SwingKind::High => (candles[j - 1].high, candles[j].high, candles[j + 1].high),
            SwingKind::Low => (candles[j - 1].low, candles[j].low, candles[j + 1].low),
        };
        let is_pivot = match kind {
            SwingKind::High => here > prev && here > next,
            SwingKind::Low => here < prev && here < next,
        };
        if !is_pivot {
            continue;
        }
        best = Some(match (best, kind) {
            (None, _) => here,
            (Some(b), SwingKind::High) => b.max(here),
            (Some(b), SwingKind::Low) => b.min(here),
        });
    }
    best
}
