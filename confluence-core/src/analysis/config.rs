//! Indicator and classification parameters shared by every timeframe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::StochRsiParams;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisConfigError {
    #[error("{field} must be >= {min}, got {value}")]
    PeriodTooSmall {
        field: &'static str,
        min: usize,
        value: usize,
    },
    #[error("ema_fast_period ({fast}) must be below ema_slow_period ({slow})")]
    EmaOrder { fast: usize, slow: usize },
    #[error("oversold ({oversold}) must be below overbought ({overbought}), both within 0..=100")]
    OscillatorBounds { oversold: f64, overbought: f64 },
    #[error("entry_tolerance_pct must be positive and finite, got {0}")]
    Tolerance(f64),
    #[error("overextended_multiplier must be > 1, got {0}")]
    OverextendedMultiplier(f64),
}

/// Default pullback band around EMA21, as a fraction of price.
pub const DEFAULT_ENTRY_TOLERANCE_PCT: f64 = 0.004;

/// Parameters for [`analyze`](super::analyze).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub rsi_period: usize,
    pub stoch_period: usize,
    pub k_smoothing: usize,
    pub d_smoothing: usize,
    pub overbought: f64,
    pub oversold: f64,
    pub swing_lookback: usize,
    /// EMA21 slope is measured against the value this many candles back.
    pub slope_lookback: usize,
    /// Drives both the ENTRY_ZONE classification and a signal's entry zone.
    pub entry_tolerance_pct: f64,
    pub overextended_multiplier: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ema_fast_period: 21,
            ema_slow_period: 200,
            rsi_period: 14,
            stoch_period: 14,
            k_smoothing: 3,
            d_smoothing: 3,
            overbought: 80.0,
            oversold: 20.0,
            swing_lookback: 20,
            slope_lookback: 3,
            entry_tolerance_pct: DEFAULT_ENTRY_TOLERANCE_PCT,
            overextended_multiplier: 3.0,
        }
    }
}

impl AnalysisConfig {
    /// Fewest candles for which an analysis can be produced at all.
    pub fn min_candles(&self) -> usize {
        self.ema_fast_period
    }

    /// Distance above which price counts as overextended.
    pub fn overextended_threshold(&self) -> f64 {
        self.entry_tolerance_pct * self.overextended_multiplier
    }

    pub fn stoch_params(&self) -> StochRsiParams {
        StochRsiParams {
            rsi_period: self.rsi_period,
            stoch_period: self.stoch_period,
            k_smoothing: self.k_smoothing,
            d_smoothing: self.d_smoothing,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisConfigError> {
        let periods = [
            ("ema_fast_period", self.ema_fast_period, 1),
            ("ema_slow_period", self.ema_slow_period, 1),
            ("rsi_period", self.rsi_period, 1),
            ("stoch_period", self.stoch_period, 1),
            ("k_smoothing", self.k_smoothing, 1),
            ("d_smoothing", self.d_smoothing, 1),
            ("swing_lookback", self.swing_lookback, 3),
            ("slope_lookback", self.slope_lookback, 1),
        ];
        for (field, value, min) in periods {
            if value < min {
                return Err(AnalysisConfigError::PeriodTooSmall { field, min, value });
            }
        }
        if self.ema_fast_period >= self.ema_slow_period {
            return Err(AnalysisConfigError::EmaOrder {
                fast: self.ema_fast_period,
                slow: self.ema_slow_period,
            });
        }
        let bounds_ok = self.oversold.is_finite()
            && self.overbought.is_finite()
            && self.oversold >= 0.0
            && self.overbought <= 100.0
            && self.oversold < self.overbought;
        if !bounds_ok {
            return Err(AnalysisConfigError::OscillatorBounds {
                oversold: self.oversold,
                overbought: self.overbought,
            });
        }
        if !(self.entry_tolerance_pct.is_finite() && self.entry_tolerance_pct > 0.0) {
            return Err(AnalysisConfigError::Tolerance(self.entry_tolerance_pct));
        }
        if !(self.overextended_multiplier.is_finite() && self.overextended_multiplier > 1.0) {
            return Err(AnalysisConfigError::OverextendedMultiplier(
                self.overextended_multiplier,
            ));
        }
        Ok(())
    }
}
