//! Per-timeframe analysis: candle history in, one immutable snapshot out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::classify::{
    classify_direction, classify_pullback, classify_trend, classify_zone, distance_pct,
    OscillatorDirection, OscillatorZone, PullbackState, Trend,
};
use super::config::AnalysisConfig;
use crate::domain::{Candle, Timeframe};
use crate::indicators::ema::ema_of_series;
use crate::indicators::stoch_rsi::stoch_rsi_bands;
use crate::indicators::swing::{swing_at, SwingKind};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("need at least {required} candles, have {available}")]
    InsufficientData { required: usize, available: usize },
    #[error("{indicator} is not a usable value at the newest candle")]
    InvalidValue { indicator: &'static str },
}

/// Snapshot of one timeframe at its newest candle.
///
/// Indicators that lack history are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeAnalysis {
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub ema21: f64,
    pub ema200: Option<f64>,
    pub oscillator_k: Option<f64>,
    pub oscillator_d: Option<f64>,
    pub oscillator_zone: Option<OscillatorZone>,
    pub oscillator_direction: Option<OscillatorDirection>,
    pub swing_high: Option<f64>,
    pub swing_low: Option<f64>,
    pub trend: Trend,
    pub pullback_state: PullbackState,
    pub distance_from_ema21_pct: f64,
    pub candle_count: usize,
}

/// Analyze `candles` (oldest first) as they stand at the last candle.
pub fn analyze(
    candles: &[Candle],
    timeframe: Timeframe,
    cfg: &AnalysisConfig,
) -> Result<TimeframeAnalysis, AnalysisError> {
    let required = cfg.min_candles();
    let available = candles.len();
    let last = match candles.last() {
        Some(last) if available >= required => last,
        _ => {
            return Err(AnalysisError::InsufficientData {
                required,
                available,
            })
        }
    };
    let t = available - 1;
    let price = last.close;
    if !(price.is_finite() && price > 0.0) {
        return Err(AnalysisError::InvalidValue { indicator: "close" });
    }

    // ── Moving averages ──
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast = ema_of_series(&closes, cfg.ema_fast_period);
    let ema21 = fast[t];
    if !ema21.is_finite() {
        return Err(AnalysisError::InvalidValue { indicator: "ema_fast" });
    }
    let ema_fast_then = t
        .checked_sub(cfg.slope_lookback)
        .map(|i| fast[i])
        .filter(|v| v.is_finite());
    let ema200 = ema_of_series(&closes, cfg.ema_slow_period)
        .last()
        .copied()
        .filter(|v| v.is_finite());

    // ── Oscillator ──
    let (k_series, d_series) = stoch_rsi_bands(candles, &cfg.stoch_params());
    let oscillator_k = k_series[t].is_finite().then_some(k_series[t]);
    let oscillator_d = d_series[t].is_finite().then_some(d_series[t]);
    let (oscillator_zone, oscillator_direction) = match (oscillator_k, oscillator_d) {
        (Some(k), Some(d)) => (
            Some(classify_zone(k, d, cfg.oversold, cfg.overbought)),
            Some(classify_direction(k, d)),
        ),
        _ => (None, None),
    };

    // ── Structure ──
    let swing_high = swing_at(candles, t, cfg.swing_lookback, SwingKind::High);
    let swing_low = swing_at(candles, t, cfg.swing_lookback, SwingKind::Low);

    let trend = classify_trend(price, ema200, ema21, ema_fast_then);
    let distance = distance_pct(price, ema21);
    let pullback_state =
        classify_pullback(distance, cfg.entry_tolerance_pct, cfg.overextended_threshold());

    Ok(TimeframeAnalysis {
        timeframe,
        timestamp: last.timestamp,
        current_price: price,
        ema21,
        ema200,
        oscillator_k,
        oscillator_d,
        oscillator_zone,
        oscillator_direction,
        swing_high,
        swing_low,
        trend,
        pullback_state,
        distance_from_ema21_pct: distance,
        candle_count: available,
    })
}
