//! Categorical readings derived from indicator values.
//!
//! Every classifier is a pure function of already-computed numbers so the
//! bucketing rules can be tested without candle fixtures.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Flat,
}

impl Trend {
    /// Trade side implied by this trend, `None` when flat.
    pub fn side(self) -> Option<Side> {
        match self {
            Self::Uptrend => Some(Side::Long),
            Self::Downtrend => Some(Side::Short),
            Self::Flat => None,
        }
    }

    /// True when this trend points against `side`. FLAT never contradicts.
    pub fn contradicts(self, side: Side) -> bool {
        self.side().is_some_and(|s| s != side)
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uptrend => "UPTREND",
            Self::Downtrend => "DOWNTREND",
            Self::Flat => "FLAT",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullbackState {
    EntryZone,
    Retracing,
    Overextended,
}

impl fmt::Display for PullbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EntryZone => "ENTRY_ZONE",
            Self::Retracing => "RETRACING",
            Self::Overextended => "OVEREXTENDED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OscillatorZone {
    Overbought,
    Oversold,
    Neutral,
}

impl OscillatorZone {
    /// True when the zone is the extreme that favours entering on `side`.
    pub fn favours(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Self::Oversold, Side::Long) | (Self::Overbought, Side::Short)
        )
    }

    /// True when the zone is the extreme that argues against `side`.
    pub fn opposes(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Self::Overbought, Side::Long) | (Self::Oversold, Side::Short)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OscillatorDirection {
    Bullish,
    Bearish,
    Flat,
}

impl OscillatorDirection {
    pub fn agrees_with(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Self::Bullish, Side::Long) | (Self::Bearish, Side::Short)
        )
    }
}

// ─── Classifiers ─────────────────────────────────────────────────────

/// Trend from price, the slow EMA and the fast-EMA slope.
///
/// Missing slow EMA or missing earlier fast-EMA value reads as FLAT.
pub fn classify_trend(
    price: f64,
    ema_slow: Option<f64>,
    ema_fast_now: f64,
    ema_fast_then: Option<f64>,
) -> Trend {
    let (Some(slow), Some(then)) = (ema_slow, ema_fast_then) else {
        return Trend::Flat;
    };
    if price > slow && ema_fast_now > then {
        Trend::Uptrend
    } else if price < slow && ema_fast_now < then {
        Trend::Downtrend
    } else {
        Trend::Flat
    }
}

/// `|price - ema| / price`. Non-finite when price is zero.
pub fn distance_pct(price: f64, ema: f64) -> f64 {
    (price - ema).abs() / price
}

/// Bucket the EMA distance. Non-finite distances read as OVEREXTENDED.
pub fn classify_pullback(distance: f64, tolerance: f64, overextended_above: f64) -> PullbackState {
    if !distance.is_finite() {
        PullbackState::Overextended
    } else if distance < tolerance {
        PullbackState::EntryZone
    } else if distance > overextended_above {
        PullbackState::Overextended
    } else {
        PullbackState::Retracing
    }
}

pub fn classify_zone(k: f64, d: f64, oversold: f64, overbought: f64) -> OscillatorZone {
    if k > overbought && d > overbought {
        OscillatorZone::Overbought
    } else if k < oversold && d < oversold {
        OscillatorZone::Oversold
    } else {
        OscillatorZone::Neutral
    }
}

pub fn classify_direction(k: f64, d: f64) -> OscillatorDirection {
    if k > d {
        OscillatorDirection::Bullish
    } else if k < d {
        OscillatorDirection::Bearish
    } else {
        OscillatorDirection::Flat
    }
}
