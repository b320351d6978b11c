//! The multi-timeframe view handed to the evaluator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::{analyze, AnalysisConfig, AnalysisError, TimeframeAnalysis};
use crate::domain::{Candle, Timeframe};

/// Per-timeframe outcome of analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeframeState {
    Ready(TimeframeAnalysis),
    Insufficient { required: usize, available: usize },
    Invalid { detail: String },
}

impl TimeframeState {
    pub fn analysis(&self) -> Option<&TimeframeAnalysis> {
        match self {
            Self::Ready(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Result<TimeframeAnalysis, AnalysisError>> for TimeframeState {
    fn from(result: Result<TimeframeAnalysis, AnalysisError>) -> Self {
        match result {
            Ok(a) => Self::Ready(a),
            Err(AnalysisError::InsufficientData {
                required,
                available,
            }) => Self::Insufficient {
                required,
                available,
            },
            Err(e) => Self::Invalid {
                detail: e.to_string(),
            },
        }
    }
}

/// Snapshot of every analyzed timeframe at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketView {
    states: BTreeMap<Timeframe, TimeframeState>,
}

impl MarketView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze each `(timeframe, candles)` slice with the same config.
    pub fn analyze<'a, I>(slices: I, cfg: &AnalysisConfig) -> Self
    where
        I: IntoIterator<Item = (Timeframe, &'a [Candle])>,
    {
        let states = slices
            .into_iter()
            .map(|(tf, candles)| (tf, TimeframeState::from(analyze(candles, tf, cfg))))
            .collect();
        Self { states }
    }

    pub fn insert(&mut self, timeframe: Timeframe, state: TimeframeState) {
        self.states.insert(timeframe, state);
    }

    /// Insert a ready analysis under its own timeframe.
    pub fn insert_analysis(&mut self, analysis: TimeframeAnalysis) {
        self.states
            .insert(analysis.timeframe, TimeframeState::Ready(analysis));
    }

    pub fn with_analysis(mut self, analysis: TimeframeAnalysis) -> Self {
        self.insert_analysis(analysis);
        self
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&TimeframeState> {
        self.states.get(&timeframe)
    }

    pub fn analysis(&self, timeframe: Timeframe) -> Option<&TimeframeAnalysis> {
        self.get(timeframe).and_then(TimeframeState::analysis)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timeframe, &TimeframeState)> {
        self.states.iter().map(|(tf, s)| (*tf, s))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
