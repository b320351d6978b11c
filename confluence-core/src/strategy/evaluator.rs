//! Strategy evaluation: GATE → CONFIRM → ENTRY → SCORE → levels.
//!
//! A pure function of the view and the profile. All state lives on the stack
//! of one call; nothing is remembered between evaluations.

use tracing::debug;

use super::profile::StrategyProfile;
use super::signal::{EntryZone, NoSignalReason, Signal};
use super::view::{MarketView, TimeframeState};
use crate::analysis::{PullbackState, TimeframeAnalysis};
use crate::domain::{Direction, Side, Timeframe};
use crate::scoring::score;

/// Evaluate `profile` against `view`.
pub fn evaluate(view: &MarketView, profile: &StrategyProfile) -> Signal {
    let mut steps: Vec<String> = Vec::new();

    // ── GATE ──
    let (anchor, side) = match select_anchor(view, profile) {
        Ok(found) => found,
        Err(rejection) => {
            debug!(profile = profile.name(), %rejection, "gate closed");
            return Signal::none(rejection, &steps, None, 0.0, Vec::new());
        }
    };
    let anchor_tf = Some(anchor.timeframe);
    steps.push(format!("{} {} anchor", anchor.timeframe, anchor.trend));

    // ── CONFIRM ──
    let mut confirmations = Vec::with_capacity(profile.confirm_timeframes().len());
    for &tf in profile.confirm_timeframes() {
        let a = match require(view, tf) {
            Ok(a) => a,
            Err(rejection) => return Signal::none(rejection, &steps, anchor_tf, 0.0, Vec::new()),
        };
        if a.trend.contradicts(side) {
            let rejection = NoSignalReason::Contradiction {
                timeframe: tf,
                trend: a.trend,
            };
            debug!(profile = profile.name(), %rejection, "confirmation failed");
            return Signal::none(rejection, &steps, anchor_tf, 0.0, Vec::new());
        }
        confirmations.push(a);
    }
    if !confirmations.is_empty() {
        let names: Vec<String> = confirmations
            .iter()
            .map(|a| format!("{} {}", a.timeframe, a.trend))
            .collect();
        steps.push(format!("confirmed by {}", names.join(", ")));
    }

    // ── ENTRY ──
    let mut entries = Vec::with_capacity(profile.entry_timeframes().len().max(1));
    if profile.entry_timeframes().is_empty() {
        entries.push(anchor);
    }
    for &tf in profile.entry_timeframes() {
        match require(view, tf) {
            Ok(a) => entries.push(a),
            Err(rejection) => return Signal::none(rejection, &steps, anchor_tf, 0.0, Vec::new()),
        }
    }
    if let Some(a) = entries
        .iter()
        .find(|a| a.pullback_state == PullbackState::Overextended)
    {
        let rejection = NoSignalReason::Overextended {
            timeframe: a.timeframe,
        };
        debug!(profile = profile.name(), %rejection, "entry timing failed");
        return Signal::none(rejection, &steps, anchor_tf, 0.0, Vec::new());
    }
    let timing: Vec<String> = entries
        .iter()
        .map(|a| format!("{} {}", a.timeframe, a.pullback_state))
        .collect();
    steps.push(format!("entry {}", timing.join(", ")));

    // ── SCORE ──
    let scored = score(side, anchor, &confirmations, &entries, profile.weights());
    let confidence = scored.confidence;
    if confidence < profile.min_confidence() {
        let rejection = NoSignalReason::LowConfidence {
            confidence,
            threshold: profile.min_confidence(),
        };
        debug!(profile = profile.name(), %rejection, "score below threshold");
        return Signal::none(rejection, &steps, anchor_tf, confidence, scored.contributions);
    }
    steps.push(format!(
        "confidence {confidence:.3} >= {:.3}",
        profile.min_confidence()
    ));

    // ── Levels ──
    let stop_tf = profile.stop_loss_timeframe();
    let stop_source = match require(view, stop_tf) {
        Ok(a) => a,
        Err(rejection) => {
            return Signal::none(rejection, &steps, anchor_tf, confidence, scored.contributions)
        }
    };
    let stop = match side {
        Side::Long => stop_source.swing_low,
        Side::Short => stop_source.swing_high,
    };
    let Some(stop) = stop else {
        let rejection = NoSignalReason::NoSwingStructure { timeframe: stop_tf };
        return Signal::none(rejection, &steps, anchor_tf, confidence, scored.contributions);
    };
    let entry = anchor.current_price;
    if !(side.sign() * (entry - stop) > 0.0) {
        let rejection = NoSignalReason::InvalidStop {
            timeframe: stop_tf,
            stop,
            entry,
        };
        debug!(profile = profile.name(), %rejection, "stop geometry rejected");
        return Signal::none(rejection, &steps, anchor_tf, confidence, scored.contributions);
    }
    let risk = (entry - stop).abs();
    let targets: Vec<f64> = profile
        .risk_reward_targets()
        .iter()
        .map(|r| entry + side.sign() * r * risk)
        .collect();
    steps.push(format!("stop {stop} from {stop_tf} swing"));

    debug!(
        profile = profile.name(),
        %side,
        confidence,
        entry,
        stop,
        "signal valid"
    );

    Signal {
        valid: true,
        direction: Direction::from(side),
        confidence,
        reason: steps.join("; "),
        rejection: None,
        anchor_timeframe: anchor_tf,
        entry_price: Some(entry),
        entry_zone: Some(EntryZone::around(anchor.ema21, profile.entry_tolerance_pct())),
        stop_loss: Some(stop),
        targets,
        risk_reward: profile.risk_reward_targets().to_vec(),
        contributions: scored.contributions,
    }
}

/// Walk the anchors in priority order; the first trending one wins.
///
/// With no trending anchor, a FLAT reading outranks data problems, and an
/// anchor that is present but unusable outranks one that is missing.
fn select_anchor<'v>(
    view: &'v MarketView,
    profile: &StrategyProfile,
) -> Result<(&'v TimeframeAnalysis, Side), NoSignalReason> {
    let mut saw_flat = false;
    let mut present_problem: Option<NoSignalReason> = None;

    for &tf in profile.anchor_timeframes() {
        match view.get(tf) {
            Some(TimeframeState::Ready(a)) => match a.trend.side() {
                Some(side) => return Ok((a, side)),
                None => saw_flat = true,
            },
            Some(state) => {
                if present_problem.is_none() {
                    present_problem = Some(unusable(tf, state));
                }
            }
            None => {}
        }
    }

    if saw_flat {
        return Err(NoSignalReason::AnchorFlat);
    }
    Err(present_problem.unwrap_or(NoSignalReason::MissingTimeframe {
        timeframe: profile.primary_anchor(),
    }))
}

fn require(view: &MarketView, tf: Timeframe) -> Result<&TimeframeAnalysis, NoSignalReason> {
    match view.get(tf) {
        Some(TimeframeState::Ready(a)) => Ok(a),
        Some(state) => Err(unusable(tf, state)),
        None => Err(NoSignalReason::MissingTimeframe { timeframe: tf }),
    }
}

fn unusable(timeframe: Timeframe, state: &TimeframeState) -> NoSignalReason {
    match state {
        TimeframeState::Insufficient {
            required,
            available,
        } => NoSignalReason::InsufficientData {
            timeframe,
            required: *required,
            available: *available,
        },
        TimeframeState::Invalid { detail } => NoSignalReason::AnalysisFailed {
            timeframe,
            detail: detail.clone(),
        },
        TimeframeState::Ready(_) => NoSignalReason::MissingTimeframe { timeframe },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{OscillatorDirection, OscillatorZone, Trend};
    use crate::strategy::ProfileKind;
    use chrono::{TimeZone, Utc};

    fn snapshot(tf: Timeframe, trend: Trend) -> TimeframeAnalysis {
        TimeframeAnalysis {
            timeframe: tf,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            current_price: 100.0,
            ema21: 99.9,
            ema200: Some(90.0),
            oscillator_k: Some(40.0),
            oscillator_d: Some(35.0),
            oscillator_zone: Some(OscillatorZone::Neutral),
            oscillator_direction: Some(OscillatorDirection::Bullish),
            swing_high: Some(104.0),
            swing_low: Some(96.0),
            trend,
            pullback_state: PullbackState::EntryZone,
            distance_from_ema21_pct: 0.001,
            candle_count: 300,
        }
    }

    fn medium() -> StrategyProfile {
        StrategyProfile::builtin(ProfileKind::Medium)
    }

    fn aligned_long() -> MarketView {
        MarketView::new()
            .with_analysis(snapshot(Timeframe::H4, Trend::Uptrend))
            .with_analysis(snapshot(Timeframe::H1, Trend::Uptrend))
            .with_analysis(snapshot(Timeframe::M15, Trend::Uptrend))
    }

    #[test]
    fn aligned_view_is_valid_long_with_levels() {
        let signal = evaluate(&aligned_long(), &medium());
        assert!(signal.valid, "{}", signal.reason);
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.anchor_timeframe, Some(Timeframe::H4));
        assert_eq!(signal.stop_loss, Some(96.0));
        assert_eq!(signal.targets, vec![104.0, 108.0, 112.0]);
        assert_eq!(signal.risk_reward, vec![1.0, 2.0, 3.0]);
        let zone = signal.entry_zone.unwrap();
        assert!((zone.min - 99.9 * 0.996).abs() < 1e-9);
        assert!(signal.confidence >= 0.60);
    }

    #[test]
    fn short_uses_swing_high() {
        let view = MarketView::new()
            .with_analysis(snapshot(Timeframe::H4, Trend::Downtrend))
            .with_analysis(snapshot(Timeframe::H1, Trend::Downtrend))
            .with_analysis({
                let mut e = snapshot(Timeframe::M15, Trend::Downtrend);
                e.oscillator_direction = Some(OscillatorDirection::Bearish);
                e
            });
        let signal = evaluate(&view, &medium());
        assert!(signal.valid, "{}", signal.reason);
        assert_eq!(signal.direction, Direction::Short);
        assert_eq!(signal.stop_loss, Some(104.0));
        assert_eq!(signal.targets, vec![96.0, 92.0, 88.0]);
    }

    #[test]
    fn secondary_anchor_takes_over_when_primary_flat() {
        let view = aligned_long().with_analysis(snapshot(Timeframe::H4, Trend::Flat));
        let signal = evaluate(&view, &medium());
        assert!(signal.valid, "{}", signal.reason);
        assert_eq!(signal.anchor_timeframe, Some(Timeframe::H1));
    }

    #[test]
    fn all_anchors_flat_is_anchor_flat() {
        let view = aligned_long()
            .with_analysis(snapshot(Timeframe::H4, Trend::Flat))
            .with_analysis(snapshot(Timeframe::H1, Trend::Flat));
        let signal = evaluate(&view, &medium());
        assert_eq!(signal.rejection, Some(NoSignalReason::AnchorFlat));
        assert_eq!(signal.direction, Direction::None);
    }

    #[test]
    fn missing_anchors_is_missing_timeframe() {
        let view = MarketView::new().with_analysis(snapshot(Timeframe::M15, Trend::Uptrend));
        let signal = evaluate(&view, &medium());
        assert_eq!(
            signal.rejection,
            Some(NoSignalReason::MissingTimeframe {
                timeframe: Timeframe::H4
            })
        );
    }

    #[test]
    fn short_anchor_history_is_insufficient() {
        let mut view = MarketView::new();
        view.insert(
            Timeframe::H4,
            TimeframeState::Insufficient {
                required: 21,
                available: 4,
            },
        );
        let signal = evaluate(&view, &medium());
        assert_eq!(
            signal.rejection,
            Some(NoSignalReason::InsufficientData {
                timeframe: Timeframe::H4,
                required: 21,
                available: 4
            })
        );
    }

    #[test]
    fn contradiction_names_timeframe() {
        let view = aligned_long().with_analysis(snapshot(Timeframe::H1, Trend::Downtrend));
        // 1h is also the secondary anchor, but 4h already qualified.
        let signal = evaluate(&view, &medium());
        assert_eq!(
            signal.rejection,
            Some(NoSignalReason::Contradiction {
                timeframe: Timeframe::H1,
                trend: Trend::Downtrend
            })
        );
    }

    #[test]
    fn flat_confirmation_does_not_block() {
        let view = aligned_long().with_analysis(snapshot(Timeframe::H1, Trend::Flat));
        let signal = evaluate(&view, &medium());
        assert!(signal.rejection != Some(NoSignalReason::AnchorFlat));
        assert!(!matches!(
            signal.rejection,
            Some(NoSignalReason::Contradiction { .. })
        ));
    }

    #[test]
    fn overextended_entry_is_rejected() {
        let mut entry = snapshot(Timeframe::M15, Trend::Uptrend);
        entry.pullback_state = PullbackState::Overextended;
        let signal = evaluate(&aligned_long().with_analysis(entry), &medium());
        assert_eq!(
            signal.rejection,
            Some(NoSignalReason::Overextended {
                timeframe: Timeframe::M15
            })
        );
    }

    #[test]
    fn weak_score_is_low_confidence() {
        let mut anchor = snapshot(Timeframe::H4, Trend::Uptrend);
        anchor.pullback_state = PullbackState::Retracing;
        let mut entry = snapshot(Timeframe::M15, Trend::Uptrend);
        entry.pullback_state = PullbackState::Retracing;
        entry.oscillator_direction = Some(OscillatorDirection::Bearish);
        entry.oscillator_zone = Some(OscillatorZone::Overbought);
        let view = aligned_long()
            .with_analysis(anchor)
            .with_analysis(snapshot(Timeframe::H1, Trend::Flat))
            .with_analysis(entry);
        // 0.35 + 0.10 + 0.075 + 0.05 + 0 - 0.05 = 0.525
        let signal = evaluate(&view, &medium());
        match signal.rejection {
            Some(NoSignalReason::LowConfidence {
                confidence,
                threshold,
            }) => {
                assert!((confidence - 0.525).abs() < 1e-9);
                assert_eq!(threshold, 0.60);
            }
            other => panic!("expected LowConfidence, got {other:?}"),
        }
        assert!(!signal.contributions.is_empty());
    }

    #[test]
    fn missing_swing_is_no_swing_structure() {
        let mut stop_tf = snapshot(Timeframe::H1, Trend::Uptrend);
        stop_tf.swing_low = None;
        let signal = evaluate(&aligned_long().with_analysis(stop_tf), &medium());
        assert_eq!(
            signal.rejection,
            Some(NoSignalReason::NoSwingStructure {
                timeframe: Timeframe::H1
            })
        );
    }

    #[test]
    fn swing_above_long_entry_is_invalid_stop() {
        let mut stop_tf = snapshot(Timeframe::H1, Trend::Uptrend);
        stop_tf.swing_low = Some(101.0);
        let signal = evaluate(&aligned_long().with_analysis(stop_tf), &medium());
        assert!(matches!(
            signal.rejection,
            Some(NoSignalReason::InvalidStop { stop, .. }) if stop == 101.0
        ));
    }

    #[test]
    fn missing_entry_timeframe_is_reported() {
        let view = MarketView::new()
            .with_analysis(snapshot(Timeframe::H4, Trend::Uptrend))
            .with_analysis(snapshot(Timeframe::H1, Trend::Uptrend));
        let signal = evaluate(&view, &medium());
        assert_eq!(
            signal.rejection,
            Some(NoSignalReason::MissingTimeframe {
                timeframe: Timeframe::M15
            })
        );
    }
}
