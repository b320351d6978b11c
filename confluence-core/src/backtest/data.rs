//! Candle data for one symbol across timeframes, and the as-of rule.
//!
//! A candle is stamped with its open time. At the close of driver bar `i`
//! every finer or equal timeframe may contribute candles opened at or before
//! bar `i`'s open; a coarser timeframe only contributes candles that have
//! fully closed by bar `i`'s close. Nothing else reaches the evaluator.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::error::BacktestError;
use crate::analysis::AnalysisConfig;
use crate::domain::{Candle, CandleSeries, RejectedCandle, Timeframe};
use crate::strategy::{MarketView, StrategyProfile};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationData {
    symbol: String,
    series: BTreeMap<Timeframe, CandleSeries>,
    rejected: Vec<RejectedCandle>,
}

impl SimulationData {
    /// Build and check that every timeframe `profile` reads is present.
    pub fn new(
        symbol: impl Into<String>,
        series: impl IntoIterator<Item = CandleSeries>,
        profile: &StrategyProfile,
    ) -> Result<Self, BacktestError> {
        let data = Self::from_series(symbol, series);
        data.validate_for(profile)?;
        Ok(data)
    }

    /// Build without profile checks, for data shared across several profiles.
    pub fn from_series(
        symbol: impl Into<String>,
        series: impl IntoIterator<Item = CandleSeries>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            series: series.into_iter().map(|s| (s.timeframe(), s)).collect(),
            rejected: Vec::new(),
        }
    }

    /// Sanitize raw candles per timeframe, keeping the rejection log.
    pub fn from_raw(
        symbol: impl Into<String>,
        raw: BTreeMap<Timeframe, Vec<Candle>>,
    ) -> Result<Self, BacktestError> {
        let mut series = BTreeMap::new();
        let mut rejected = Vec::new();
        for (tf, candles) in raw {
            let (s, dropped) = CandleSeries::sanitize(tf, candles)?;
            rejected.extend(dropped);
            series.insert(tf, s);
        }
        Ok(Self {
            symbol: symbol.into(),
            series,
            rejected,
        })
    }

    pub fn with_rejections(mut self, rejected: Vec<RejectedCandle>) -> Self {
        self.rejected.extend(rejected);
        self
    }

    pub fn validate_for(&self, profile: &StrategyProfile) -> Result<(), BacktestError> {
        match profile
            .timeframes()
            .into_iter()
            .find(|tf| !self.series.contains_key(tf))
        {
            Some(timeframe) => Err(BacktestError::MissingTimeframe {
                symbol: self.symbol.clone(),
                profile: profile.name().to_string(),
                timeframe,
            }),
            None => Ok(()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn series(&self, timeframe: Timeframe) -> Option<&CandleSeries> {
        self.series.get(&timeframe)
    }

    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.series.keys().copied()
    }

    pub fn rejected(&self) -> &[RejectedCandle] {
        &self.rejected
    }

    /// Candles of `timeframe` visible at the close of the driver bar opened at `bar_time`.
    pub fn visible(
        &self,
        timeframe: Timeframe,
        driver: Timeframe,
        bar_time: DateTime<Utc>,
    ) -> &[Candle] {
        match self.series.get(&timeframe) {
            Some(series) => visible_at(series, driver, bar_time),
            None => &[],
        }
    }

    /// Analyze every listed timeframe as of the driver bar opened at `bar_time`.
    pub fn view_at(
        &self,
        timeframes: &BTreeSet<Timeframe>,
        driver: Timeframe,
        bar_time: DateTime<Utc>,
        cfg: &AnalysisConfig,
    ) -> MarketView {
        MarketView::analyze(
            timeframes.iter().filter_map(|&tf| {
                self.series
                    .get(&tf)
                    .map(|s| (tf, visible_at(s, driver, bar_time)))
            }),
            cfg,
        )
    }
}

/// The as-of rule for one series. See the module docs.
pub fn visible_at(series: &CandleSeries, driver: Timeframe, bar_time: DateTime<Utc>) -> &[Candle] {
    let tf = series.timeframe();
    if tf <= driver {
        series.as_of(bar_time)
    } else {
        series.as_of(bar_time + driver.duration() - tf.duration())
    }
}
