//! Confluence scoring: how strongly a set of timeframe snapshots backs a side.
//!
//! The score is a clamped sum of named terms. Terms are appended in a fixed
//! order so the itemized breakdown is stable across runs. No thresholding
//! happens here; the evaluator decides what confidence is enough.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::analysis::{PullbackState, TimeframeAnalysis, Trend};
use crate::domain::{Side, Timeframe};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("confluence weight {field} must be finite and >= 0, got {value}")]
pub struct WeightError {
    pub field: &'static str,
    pub value: f64,
}

/// Weight table for [`score`]. Group weights are split evenly across the
/// timeframes in that group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceWeights {
    pub anchor_trend: f64,
    pub confirmation_trend: f64,
    /// Fraction of a confirmation share credited when that timeframe is FLAT.
    pub confirmation_flat_factor: f64,
    /// Fraction of a confirmation share deducted when that timeframe contradicts.
    pub confirmation_contradiction_factor: f64,
    pub anchor_pullback: f64,
    /// Fraction of a pullback weight credited while RETRACING.
    pub retracing_factor: f64,
    /// Absolute deduction when the anchor is OVEREXTENDED.
    pub overextended_penalty: f64,
    pub entry_pullback: f64,
    pub entry_oscillator: f64,
    pub oscillator_zone: f64,
}

impl Default for ConfluenceWeights {
    fn default() -> Self {
        Self {
            anchor_trend: 0.35,
            confirmation_trend: 0.20,
            confirmation_flat_factor: 0.5,
            confirmation_contradiction_factor: 1.0,
            anchor_pullback: 0.15,
            retracing_factor: 0.5,
            overextended_penalty: 0.10,
            entry_pullback: 0.10,
            entry_oscillator: 0.15,
            oscillator_zone: 0.05,
        }
    }
}

impl ConfluenceWeights {
    pub fn validate(&self) -> Result<(), WeightError> {
        let fields = [
            ("anchor_trend", self.anchor_trend),
            ("confirmation_trend", self.confirmation_trend),
            ("confirmation_flat_factor", self.confirmation_flat_factor),
            (
                "confirmation_contradiction_factor",
                self.confirmation_contradiction_factor,
            ),
            ("anchor_pullback", self.anchor_pullback),
            ("retracing_factor", self.retracing_factor),
            ("overextended_penalty", self.overextended_penalty),
            ("entry_pullback", self.entry_pullback),
            ("entry_oscillator", self.entry_oscillator),
            ("oscillator_zone", self.oscillator_zone),
        ];
        for (field, value) in fields {
            if !(value.is_finite() && value >= 0.0) {
                return Err(WeightError { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTerm {
    AnchorTrend,
    ConfirmationTrend,
    AnchorPullback,
    EntryPullback,
    EntryOscillator,
    OscillatorZone,
}

impl fmt::Display for ScoreTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AnchorTrend => "anchor_trend",
            Self::ConfirmationTrend => "confirmation_trend",
            Self::AnchorPullback => "anchor_pullback",
            Self::EntryPullback => "entry_pullback",
            Self::EntryOscillator => "entry_oscillator",
            Self::OscillatorZone => "oscillator_zone",
        })
    }
}

/// One itemized score term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub name: ScoreTerm,
    pub timeframe: Timeframe,
    pub value: f64,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceScore {
    /// Sum of contribution values, clamped to [0, 1].
    pub confidence: f64,
    pub contributions: Vec<Contribution>,
}

impl ConfluenceScore {
    /// Unclamped sum of every term.
    pub fn raw_total(&self) -> f64 {
        self.contributions.iter().map(|c| c.value).sum()
    }
}

/// Score the hypothesis `side` against the anchor, confirmation and entry snapshots.
pub fn score(
    side: Side,
    anchor: &TimeframeAnalysis,
    confirmations: &[&TimeframeAnalysis],
    entries: &[&TimeframeAnalysis],
    weights: &ConfluenceWeights,
) -> ConfluenceScore {
    let mut contributions = Vec::new();
    let mut push = |name, timeframe, value: f64, detail: String| {
        contributions.push(Contribution {
            name,
            timeframe,
            value,
            detail,
        })
    };

    // ── Trend alignment ──
    let anchor_value = if anchor.trend.side() == Some(side) {
        weights.anchor_trend
    } else {
        0.0
    };
    push(
        ScoreTerm::AnchorTrend,
        anchor.timeframe,
        anchor_value,
        format!("{} anchor {}", anchor.timeframe, anchor.trend),
    );

    let confirm_share = share(weights.confirmation_trend, confirmations.len());
    for a in confirmations {
        let value = match a.trend {
            Trend::Flat => confirm_share * weights.confirmation_flat_factor,
            t if t.contradicts(side) => -confirm_share * weights.confirmation_contradiction_factor,
            _ => confirm_share,
        };
        push(
            ScoreTerm::ConfirmationTrend,
            a.timeframe,
            value,
            format!("{} {}", a.timeframe, a.trend),
        );
    }

    // ── Pullback quality ──
    let anchor_pullback = match anchor.pullback_state {
        PullbackState::EntryZone => weights.anchor_pullback,
        PullbackState::Retracing => weights.anchor_pullback * weights.retracing_factor,
        PullbackState::Overextended => -weights.overextended_penalty,
    };
    push(
        ScoreTerm::AnchorPullback,
        anchor.timeframe,
        anchor_pullback,
        format!("{} {}", anchor.timeframe, anchor.pullback_state),
    );

    // Entry timeframes lose their full share when overextended.
    let entry_share = share(weights.entry_pullback, entries.len());
    for a in entries {
        let value = match a.pullback_state {
            PullbackState::EntryZone => entry_share,
            PullbackState::Retracing => entry_share * weights.retracing_factor,
            PullbackState::Overextended => -entry_share,
        };
        push(
            ScoreTerm::EntryPullback,
            a.timeframe,
            value,
            format!("{} {}", a.timeframe, a.pullback_state),
        );
    }

    // ── Oscillator timing ──
    let osc_share = share(weights.entry_oscillator, entries.len());
    for a in entries {
        let (value, detail) = match a.oscillator_direction {
            Some(d) if d.agrees_with(side) => (osc_share, format!("{} {d:?} momentum", a.timeframe)),
            Some(d) => (0.0, format!("{} {d:?} momentum", a.timeframe)),
            None => (0.0, format!("{} oscillator unavailable", a.timeframe)),
        };
        push(ScoreTerm::EntryOscillator, a.timeframe, value, detail);
    }

    let zone_share = share(weights.oscillator_zone, entries.len());
    for a in entries {
        let (value, detail) = match a.oscillator_zone {
            Some(z) if z.favours(side) => (zone_share, format!("{} {z:?}", a.timeframe)),
            Some(z) if z.opposes(side) => (-zone_share, format!("{} {z:?}", a.timeframe)),
            Some(z) => (0.0, format!("{} {z:?}", a.timeframe)),
            None => (0.0, format!("{} oscillator unavailable", a.timeframe)),
        };
        push(ScoreTerm::OscillatorZone, a.timeframe, value, detail);
    }

    let raw: f64 = contributions.iter().map(|c| c.value).sum();
    ConfluenceScore {
        confidence: raw.clamp(0.0, 1.0),
        contributions,
    }
}

fn share(weight: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        weight / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{OscillatorDirection, OscillatorZone};
    use chrono::{TimeZone, Utc};

    fn snapshot(tf: Timeframe, trend: Trend, pullback: PullbackState) -> TimeframeAnalysis {
        TimeframeAnalysis {
            timeframe: tf,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            current_price: 100.0,
            ema21: 100.0,
            ema200: Some(95.0),
            oscillator_k: Some(30.0),
            oscillator_d: Some(25.0),
            oscillator_zone: Some(OscillatorZone::Neutral),
            oscillator_direction: Some(OscillatorDirection::Bullish),
            swing_high: Some(104.0),
            swing_low: Some(97.0),
            trend,
            pullback_state: pullback,
            distance_from_ema21_pct: 0.0,
            candle_count: 300,
        }
    }

    #[test]
    fn full_alignment_scores_high() {
        let anchor = snapshot(Timeframe::H4, Trend::Uptrend, PullbackState::EntryZone);
        let confirm = snapshot(Timeframe::H1, Trend::Uptrend, PullbackState::Retracing);
        let mut entry = snapshot(Timeframe::M15, Trend::Uptrend, PullbackState::EntryZone);
        entry.oscillator_zone = Some(OscillatorZone::Oversold);

        let s = score(Side::Long, &anchor, &[&confirm], &[&entry], &ConfluenceWeights::default());
        assert!((s.confidence - 1.0).abs() < 1e-12, "got {}", s.confidence);
        let names: Vec<ScoreTerm> = s.contributions.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                ScoreTerm::AnchorTrend,
                ScoreTerm::ConfirmationTrend,
                ScoreTerm::AnchorPullback,
                ScoreTerm::EntryPullback,
                ScoreTerm::EntryOscillator,
                ScoreTerm::OscillatorZone,
            ]
        );
    }

    #[test]
    fn flat_confirmation_gets_partial_credit() {
        let anchor = snapshot(Timeframe::H4, Trend::Uptrend, PullbackState::EntryZone);
        let confirm = snapshot(Timeframe::H1, Trend::Flat, PullbackState::EntryZone);
        let s = score(Side::Long, &anchor, &[&confirm], &[], &ConfluenceWeights::default());
        assert!((s.contributions[1].value - 0.10).abs() < 1e-12);
    }

    #[test]
    fn contradiction_and_overextension_subtract() {
        let anchor = snapshot(Timeframe::H4, Trend::Uptrend, PullbackState::Overextended);
        let confirm = snapshot(Timeframe::H1, Trend::Downtrend, PullbackState::EntryZone);
        let s = score(Side::Long, &anchor, &[&confirm], &[], &ConfluenceWeights::default());
        assert!((s.contributions[1].value + 0.20).abs() < 1e-12);
        assert!((s.contributions[2].value + 0.10).abs() < 1e-12);
        assert!((s.raw_total() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn confidence_is_clamped_at_zero() {
        let anchor = snapshot(Timeframe::H4, Trend::Downtrend, PullbackState::Overextended);
        let confirm = snapshot(Timeframe::H1, Trend::Downtrend, PullbackState::EntryZone);
        let s = score(Side::Long, &anchor, &[&confirm], &[], &ConfluenceWeights::default());
        assert!(s.raw_total() < 0.0);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn group_weights_split_across_timeframes() {
        let anchor = snapshot(Timeframe::D1, Trend::Uptrend, PullbackState::EntryZone);
        let e1 = snapshot(Timeframe::H1, Trend::Uptrend, PullbackState::EntryZone);
        let mut e2 = snapshot(Timeframe::M15, Trend::Uptrend, PullbackState::EntryZone);
        e2.oscillator_direction = None;
        let s = score(Side::Long, &anchor, &[], &[&e1, &e2], &ConfluenceWeights::default());
        let osc: Vec<f64> = s
            .contributions
            .iter()
            .filter(|c| c.name == ScoreTerm::EntryOscillator)
            .map(|c| c.value)
            .collect();
        assert_eq!(osc.len(), 2);
        assert!((osc[0] - 0.075).abs() < 1e-12);
        assert_eq!(osc[1], 0.0);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let w = ConfluenceWeights {
            entry_oscillator: -0.1,
            ..Default::default()
        };
        assert_eq!(
            w.validate(),
            Err(WeightError {
                field: "entry_oscillator",
                value: -0.1
            })
        );
    }

    #[test]
    fn term_serializes_snake_case() {
        let json = serde_json::to_string(&ScoreTerm::AnchorTrend).unwrap();
        assert_eq!(json, "\"anchor_trend\"");
    }
}
