//! Series indicators.
//!
//! Indicators are pure functions: candle history in, numeric series out, same
//! length as the input, `f64::NAN` during warmup. The analysis engine reads the
//! last value of each series; the full series exists so every indicator can be
//! checked for look-ahead by comparing truncated and full computations.
//!
//! Multi-series indicators (Stochastic RSI, swing structure) are exposed as
//! separate named instances per band, keeping the single-series trait.

pub mod ema;
pub mod rsi;
pub mod sma;
pub mod stoch_rsi;
pub mod swing;

pub use ema::Ema;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stoch_rsi::{StochRsi, StochRsiBand, StochRsiParams};
pub use swing::{Swing, SwingKind};

use crate::domain::Candle;

/// Trait for series indicators.
///
/// # Look-ahead contamination guard
/// No value at index t may depend on candles at t+1 or later. Every indicator
/// must pass the truncated-vs-full series test in `tests/lookahead_test.rs`.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_21", "stoch_rsi_k_14_14_3_3").
    fn name(&self) -> &str;

    /// Number of candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole slice.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;

    /// Value at the newest candle, or `None` while warming up.
    fn latest(&self, candles: &[Candle]) -> Option<f64> {
        self.compute(candles).last().copied().filter(|v| v.is_finite())
    }
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000,
/// one candle per hour from 2024-01-02T00:00Z.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                base + Duration::hours(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
