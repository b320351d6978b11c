//! Run orchestration: config → candles → batch backtests or a signal scan.
//!
//! Two entry points:
//! - `run_backtests()`: every (symbol × profile) pair through the simulator,
//!   each successful run wrapped in a fingerprinted `RunReport`.
//! - `scan_signals()`: the latest as-of signal for every pair. Used by the CLI
//!   `signal` command.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use confluence_core::backtest::{BacktestError, BacktestResult, SimulationData};
use confluence_core::domain::Timeframe;
use confluence_core::strategy::StrategyProfile;

use crate::batch::{cartesian_jobs, run_batch};
use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_symbol, LoadError, LoadedData};
use crate::fingerprint::RunFingerprint;
use crate::scan::{scan_all, ScanEntry};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("failed to fingerprint run: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// A finished backtest with the provenance needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: RunFingerprint,
    /// True when the candles came from the synthetic generator.
    pub synthetic: bool,
    pub result: BacktestResult,
}

/// A pairing whose simulator run failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
    pub symbol: String,
    pub profile: String,
    pub error: BacktestError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub reports: Vec<RunReport>,
    pub failures: Vec<RunFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub synthetic: bool,
    pub entries: Vec<ScanEntry>,
    /// Pairings that could not be evaluated, as display strings.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Union of every timeframe the configured profiles read.
pub fn required_timeframes(profiles: &[StrategyProfile]) -> BTreeSet<Timeframe> {
    profiles.iter().flat_map(|p| p.timeframes()).collect()
}

/// Load every configured symbol once, for all profiles at the same time.
pub fn load_all(
    config: &RunConfig,
    profiles: &[StrategyProfile],
) -> Result<Vec<LoadedData>, RunError> {
    let timeframes = required_timeframes(profiles);
    config
        .symbols()
        .iter()
        .map(|symbol| load_symbol(&config.data, symbol, &timeframes).map_err(RunError::from))
        .collect()
}

pub fn run_backtests(config: &RunConfig) -> Result<BatchReport, RunError> {
    run_backtests_with_cancel(config, &AtomicBool::new(false))
}

/// Backtest every (symbol × profile) pair in parallel.
///
/// Config and load errors abort before any simulation. A failing pair is
/// recorded in `failures` and the rest still run.
pub fn run_backtests_with_cancel(
    config: &RunConfig,
    cancel: &AtomicBool,
) -> Result<BatchReport, RunError> {
    config.validate()?;
    let profiles = config.profiles()?;
    let loaded = load_all(config, &profiles)?;

    let mut provenance: BTreeMap<String, (String, bool)> = BTreeMap::new();
    let mut datasets = Vec::with_capacity(loaded.len());
    for LoadedData {
        data,
        dataset_hash,
        synthetic,
    } in loaded
    {
        provenance.insert(data.symbol().to_string(), (dataset_hash, synthetic));
        datasets.push(Arc::new(data));
    }

    let backtest = config.backtest_config();
    let jobs = cartesian_jobs(&datasets, &profiles);
    info!(
        symbols = datasets.len(),
        profiles = profiles.len(),
        "running backtests"
    );
    let outcomes = run_batch(&jobs, &config.analysis, &backtest, cancel);

    let mut report = BatchReport::default();
    for (job, outcome) in jobs.iter().zip(outcomes) {
        match outcome.result {
            Ok(result) => {
                let (dataset_hash, synthetic) = provenance
                    .get(job.data.symbol())
                    .map(|(h, s)| (h.as_str(), *s))
                    .unwrap_or(("", false));
                let fingerprint =
                    RunFingerprint::compute(&job.profile, &config.analysis, &backtest, dataset_hash)?;
                info!(
                    symbol = %result.symbol,
                    profile = %result.profile,
                    run = fingerprint.short_id(),
                    trades = result.stats.trade_count,
                    total_r = result.stats.total_r,
                    "backtest complete"
                );
                report.reports.push(RunReport {
                    schema_version: SCHEMA_VERSION,
                    fingerprint,
                    synthetic,
                    result,
                });
            }
            Err(error) => report.failures.push(RunFailure {
                symbol: outcome.symbol,
                profile: outcome.profile,
                error,
            }),
        }
    }
    Ok(report)
}

/// Evaluate the newest as-of view for every (symbol × profile) pair.
pub fn scan_signals(config: &RunConfig) -> Result<ScanReport, RunError> {
    config.validate()?;
    let profiles = config.profiles()?;
    let loaded = load_all(config, &profiles)?;
    let synthetic = loaded.iter().any(|l| l.synthetic);
    let datasets: Vec<Arc<SimulationData>> =
        loaded.into_iter().map(|l| Arc::new(l.data)).collect();

    let (entries, errors) = scan_all(&datasets, &profiles, &config.analysis);
    info!(
        entries = entries.len(),
        valid = entries.iter().filter(|e| e.signal.valid).count(),
        errors = errors.len(),
        "scan complete"
    );
    Ok(ScanReport {
        schema_version: SCHEMA_VERSION,
        synthetic,
        entries,
        errors: errors.iter().map(ToString::to_string).collect(),
    })
}
