//! Stochastic RSI.
//!
//! raw[t] = (rsi[t] - min(rsi, stoch_period)) / (max - min) * 100, 50 when the
//! window is flat. %K = SMA(raw, k_smoothing), %D = SMA(%K, d_smoothing).
//! Each band is its own indicator instance.

use serde::{Deserialize, Serialize};

use super::rsi::rsi_of_series;
use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StochRsiParams {
    pub rsi_period: usize,
    pub stoch_period: usize,
    pub k_smoothing: usize,
    pub d_smoothing: usize,
}

impl Default for StochRsiParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            stoch_period: 14,
            k_smoothing: 3,
            d_smoothing: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StochRsiBand {
    K,
    D,
}

#[derive(Debug, Clone)]
pub struct StochRsi {
    params: StochRsiParams,
    band: StochRsiBand,
    name: String,
}

impl StochRsi {
    pub fn new(params: StochRsiParams, band: StochRsiBand) -> Self {
        assert!(
            params.rsi_period >= 1
                && params.stoch_period >= 1
                && params.k_smoothing >= 1
                && params.d_smoothing >= 1,
            "StochRSI periods must be >= 1"
        );
        let band_str = match band {
            StochRsiBand::K => "k",
            StochRsiBand::D => "d",
        };
        Self {
            params,
            band,
            name: format!(
                "stoch_rsi_{band_str}_{}_{}_{}_{}",
                params.rsi_period, params.stoch_period, params.k_smoothing, params.d_smoothing
            ),
        }
    }

    pub fn k(params: StochRsiParams) -> Self {
        Self::new(params, StochRsiBand::K)
    }

    pub fn d(params: StochRsiParams) -> Self {
        Self::new(params, StochRsiBand::D)
    }
}

impl Indicator for StochRsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        let p = &self.params;
        let k = p.rsi_period + p.stoch_period - 1 + p.k_smoothing - 1;
        match self.band {
            StochRsiBand::K => k,
            StochRsiBand::D => k + p.d_smoothing - 1,
        }
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let (k, d) = stoch_rsi_bands(candles, &self.params);
        match self.band {
            StochRsiBand::K => k,
            StochRsiBand::D => d,
        }
    }
}

/// Both %K and %D in one pass.
pub fn stoch_rsi_bands(candles: &[Candle], params: &StochRsiParams) -> (Vec<f64>, Vec<f64>) {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let rsi = rsi_of_series(&closes, params.rsi_period);
    let raw = stochastic_of_series(&rsi, params.stoch_period);
    let k = sma_of_series(&raw, params.k_smoothing);
    let d = sma_of_series(&k, params.d_smoothing);
    (k, d)
}

fn stochastic_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let lo = window.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = hi - lo;
        result[i] = if range > 0.0 {
            (values[i] - lo) / range * 100.0
        } else {
            50.0
        };
    }

    result
}
