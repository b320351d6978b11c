//! One-shot signal scan: evaluate the latest as-of view for each symbol.
//!
//! The view is built exactly as the simulator builds it for its final driver
//! bar, so a scan and the last bar of a backtest over the same candles agree.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use confluence_core::analysis::AnalysisConfig;
use confluence_core::backtest::{check_entry_tolerance, BacktestError, SimulationData};
use confluence_core::strategy::{Session, Signal, StrategyProfile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    pub symbol: String,
    pub profile: String,
    /// Open time of the driver candle the view was taken at.
    pub as_of: DateTime<Utc>,
    pub signal: Signal,
}

/// Evaluate `profile` on the newest driver candle of `data`.
pub fn scan_latest(
    data: &SimulationData,
    profile: &StrategyProfile,
    cfg: &AnalysisConfig,
) -> Result<ScanEntry, BacktestError> {
    check_entry_tolerance(profile, cfg)?;
    data.validate_for(profile)?;
    let driver = profile.primary_anchor();
    let Some(last) = data.series(driver).and_then(|s| s.last()) else {
        return Err(BacktestError::MissingTimeframe {
            symbol: data.symbol().to_string(),
            profile: profile.name().to_string(),
            timeframe: driver,
        });
    };

    let session = Session::new(data.symbol(), profile.clone());
    let view = data.view_at(&profile.timeframes(), driver, last.timestamp, cfg);
    let signal = session.evaluate(&view);
    debug!(
        symbol = session.symbol(),
        profile = profile.name(),
        valid = signal.valid,
        confidence = signal.confidence,
        "scanned"
    );

    Ok(ScanEntry {
        symbol: session.symbol().to_string(),
        profile: profile.name().to_string(),
        as_of: last.timestamp,
        signal,
    })
}

/// Scan every (symbol, profile) pair. Failures are returned alongside the
/// entries so one bad symbol does not hide the rest.
pub fn scan_all(
    datasets: &[Arc<SimulationData>],
    profiles: &[StrategyProfile],
    cfg: &AnalysisConfig,
) -> (Vec<ScanEntry>, Vec<BacktestError>) {
    let pairs: Vec<(&Arc<SimulationData>, &StrategyProfile)> = datasets
        .iter()
        .flat_map(|d| profiles.iter().map(move |p| (d, p)))
        .collect();

    let results: Vec<Result<ScanEntry, BacktestError>> = pairs
        .par_iter()
        .map(|(data, profile)| scan_latest(data, profile, cfg))
        .collect();

    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for r in results {
        match r {
            Ok(e) => entries.push(e),
            Err(e) => errors.push(e),
        }
    }
    rank(&mut entries);
    (entries, errors)
}

/// Valid signals first, then by confidence descending, then symbol.
pub fn rank(entries: &mut [ScanEntry]) {
    entries.sort_by(|a, b| {
        b.signal
            .valid
            .cmp(&a.signal.valid)
            .then_with(|| {
                b.signal
                    .confidence
                    .partial_cmp(&a.signal.confidence)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.symbol.cmp(&b.symbol))
            .then_with(|| a.profile.cmp(&b.profile))
    });
}
