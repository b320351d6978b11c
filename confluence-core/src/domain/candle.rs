//! Candle — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle for a single timeframe.
///
/// `timestamp` is the candle's open time. Within a series timestamps are
/// strictly increasing; `CandleSeries::sanitize` enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if every price field is finite.
    pub fn has_finite_prices(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }

    /// OHLC envelope check: high is the maximum and low the minimum of the bar.
    pub fn has_valid_envelope(&self) -> bool {
        self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close).min(self.high)
    }

    /// Why this candle would be rejected, ignoring timestamp ordering.
    pub fn defect(&self) -> Option<CandleRejection> {
        if !self.has_finite_prices() {
            return Some(CandleRejection::NonFinitePrice);
        }
        if !(self.volume.is_finite() && self.volume > 0.0) {
            return Some(CandleRejection::NonPositiveVolume);
        }
        if !self.has_valid_envelope() {
            return Some(CandleRejection::BrokenEnvelope);
        }
        None
    }

    /// Full high-low range of the candle.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Reason a candle was dropped from a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandleRejection {
    NonFinitePrice,
    NonPositiveVolume,
    BrokenEnvelope,
    NonIncreasingTimestamp,
}

impl std::fmt::Display for CandleRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NonFinitePrice => "non-finite price",
            Self::NonPositiveVolume => "non-positive volume",
            Self::BrokenEnvelope => "high/low do not bound open/close",
            Self::NonIncreasingTimestamp => "timestamp not after previous candle",
        };
        f.write_str(text)
    }
}
