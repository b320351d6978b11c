//! Per-symbol evaluation context.

use serde::Serialize;

use super::evaluator::evaluate;
use super::profile::StrategyProfile;
use super::signal::Signal;
use super::view::MarketView;
use crate::analysis::AnalysisConfig;
use crate::domain::{Candle, Timeframe};

/// A symbol paired with the strategy profile currently applied to it.
///
/// Switching strategy means building a new `Session`; evaluation never reads
/// anything outside the session and the view it is given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    symbol: String,
    profile: StrategyProfile,
}

impl Session {
    pub fn new(symbol: impl Into<String>, profile: StrategyProfile) -> Self {
        Self {
            symbol: symbol.into(),
            profile,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn profile(&self) -> &StrategyProfile {
        &self.profile
    }

    pub fn with_profile(self, profile: StrategyProfile) -> Self {
        Self { profile, ..self }
    }

    pub fn evaluate(&self, view: &MarketView) -> Signal {
        evaluate(view, &self.profile)
    }

    /// Analyze the slices for every timeframe the profile reads, then evaluate.
    ///
    /// Slices for timeframes the profile does not reference are ignored.
    pub fn analyze_and_evaluate<'a, I>(&self, slices: I, cfg: &AnalysisConfig) -> (MarketView, Signal)
    where
        I: IntoIterator<Item = (Timeframe, &'a [Candle])>,
    {
        let wanted = self.profile.timeframes();
        let view = MarketView::analyze(
            slices.into_iter().filter(|(tf, _)| wanted.contains(tf)),
            cfg,
        );
        let signal = self.evaluate(&view);
        (view, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{NoSignalReason, ProfileKind};

    #[test]
    fn switching_profile_changes_required_timeframes() {
        let session = Session::new("BTCUSDT", StrategyProfile::builtin(ProfileKind::Medium));
        let signal = session.evaluate(&MarketView::new());
        assert_eq!(
            signal.rejection,
            Some(NoSignalReason::MissingTimeframe {
                timeframe: Timeframe::H4
            })
        );

        let session = session.with_profile(StrategyProfile::builtin(ProfileKind::Slow));
        assert_eq!(session.symbol(), "BTCUSDT");
        let signal = session.evaluate(&MarketView::new());
        assert_eq!(
            signal.rejection,
            Some(NoSignalReason::MissingTimeframe {
                timeframe: Timeframe::D1
            })
        );
    }

    #[test]
    fn analyze_and_evaluate_skips_unreferenced_timeframes() {
        let session = Session::new("ETHUSDT", StrategyProfile::builtin(ProfileKind::Fast));
        let candles = crate::indicators::make_candles(&[100.0; 30]);
        let (view, _) = session.analyze_and_evaluate(
            [
                (Timeframe::W1, candles.as_slice()),
                (Timeframe::H1, candles.as_slice()),
            ],
            &AnalysisConfig::default(),
        );
        assert!(view.get(Timeframe::W1).is_none());
        assert!(view.get(Timeframe::H1).is_some());
    }
}
