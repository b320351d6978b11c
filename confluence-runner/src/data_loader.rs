//! Candle loading for the runner.
//!
//! Two sources, chosen by `[data]`:
//! 1. CSV files `<dir>/<symbol>_<timeframe>.csv`, one per timeframe the
//!    profiles read, with header `timestamp,open,high,low,close,volume`.
//!    Timestamps are RFC 3339 or integer epoch milliseconds.
//! 2. Synthetic: a seeded random walk on the finest timeframe, resampled into
//!    the coarser ones so every timeframe tells the same story.
//!
//! Either way the raw candles go through `CandleSeries::sanitize`; rejected
//! candles are logged there and kept on the `SimulationData`.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use confluence_core::backtest::{BacktestError, SimulationData};
use confluence_core::domain::{resample, Candle, Timeframe};

use crate::config::DataConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no candle file for {symbol} {timeframe}: expected {path}")]
    MissingFile {
        symbol: String,
        timeframe: Timeframe,
        path: PathBuf,
    },
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} line {line}: unparseable timestamp '{value}'")]
    Timestamp {
        path: PathBuf,
        line: usize,
        value: String,
    },
    #[error("{symbol}: {source}")]
    Series {
        symbol: String,
        #[source]
        source: BacktestError,
    },
    #[error("no data source configured")]
    NoSource,
}

/// Sanitized candles for one symbol plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub data: SimulationData,
    /// BLAKE3 over every accepted candle, in timeframe order.
    pub dataset_hash: String,
    pub synthetic: bool,
}

/// Load `symbol` for every timeframe in `timeframes`.
pub fn load_symbol(
    config: &DataConfig,
    symbol: &str,
    timeframes: &BTreeSet<Timeframe>,
) -> Result<LoadedData, LoadError> {
    let (raw, synthetic) = match (&config.dir, config.synthetic) {
        (_, true) => (
            generate_synthetic(symbol, config.seed, config.bars, timeframes),
            true,
        ),
        (Some(dir), false) => (load_csv_dir(dir, symbol, timeframes)?, false),
        (None, false) => return Err(LoadError::NoSource),
    };

    let data = SimulationData::from_raw(symbol, raw).map_err(|source| LoadError::Series {
        symbol: symbol.to_string(),
        source,
    })?;
    let dataset_hash = compute_dataset_hash(&data);
    info!(
        symbol,
        timeframes = timeframes.len(),
        synthetic,
        rejected = data.rejected().len(),
        "candles loaded"
    );

    Ok(LoadedData {
        data,
        dataset_hash,
        synthetic,
    })
}

// ─── CSV ─────────────────────────────────────────────────────────────

pub fn csv_path(dir: &Path, symbol: &str, timeframe: Timeframe) -> PathBuf {
    dir.join(format!("{symbol}_{timeframe}.csv"))
}

fn load_csv_dir(
    dir: &Path,
    symbol: &str,
    timeframes: &BTreeSet<Timeframe>,
) -> Result<BTreeMap<Timeframe, Vec<Candle>>, LoadError> {
    let mut raw = BTreeMap::new();
    for &timeframe in timeframes {
        let path = csv_path(dir, symbol, timeframe);
        if !path.is_file() {
            return Err(LoadError::MissingFile {
                symbol: symbol.to_string(),
                timeframe,
                path,
            });
        }
        raw.insert(timeframe, read_candles_csv(&path)?);
    }
    Ok(raw)
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Read one candle file. Rows keep file order; validation happens later.
pub fn read_candles_csv(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut candles = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(csv_err)?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            path: path.to_path_buf(),
            // header is line 1
            line: i + 2,
            value: row.timestamp.clone(),
        })?;
        candles.push(Candle::new(
            timestamp, row.open, row.high, row.low, row.close, row.volume,
        ));
    }
    Ok(candles)
}

/// Write candles in the format `read_candles_csv` accepts.
pub fn write_candles_csv(path: &Path, candles: &[Candle]) -> Result<(), LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for c in candles {
        writer
            .serialize(CsvRow {
                timestamp: c.timestamp.to_rfc3339(),
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            })
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| csv_err(e.into()))
}

/// RFC 3339, or integer milliseconds since the Unix epoch.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    let millis: i64 = text.parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

// ─── Synthetic ───────────────────────────────────────────────────────

/// Candles between drift changes on the finest timeframe.
const REGIME_LEN: usize = 400;

fn synthetic_start() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap_or_default()
}

/// Seeded random walk with trending regimes.
///
/// `bars` counts candles of the coarsest requested timeframe; the finest one
/// gets proportionally more. The seed mixes in the symbol so several symbols
/// from one config differ.
pub fn generate_synthetic(
    symbol: &str,
    seed: u64,
    bars: usize,
    timeframes: &BTreeSet<Timeframe>,
) -> BTreeMap<Timeframe, Vec<Candle>> {
    let (Some(&finest), Some(&coarsest)) = (timeframes.first(), timeframes.last()) else {
        return BTreeMap::new();
    };
    let ratio = (coarsest.minutes() / finest.minutes()) as usize;
    let count = bars * ratio;

    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let start = synthetic_start();
    let mut price = 100.0_f64;
    let mut drift = 0.0_f64;
    let mut candles = Vec::with_capacity(count);
    for i in 0..count {
        if i % REGIME_LEN == 0 {
            drift = rng.gen_range(-0.0008..0.0008);
        }
        let step: f64 = drift + rng.gen_range(-0.004..0.004);
        let open = price;
        let close = price * (1.0 + step);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));
        let volume = rng.gen_range(100.0..1_000.0);
        candles.push(Candle::new(
            start + chrono::Duration::minutes(finest.minutes() * i as i64),
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }

    timeframes
        .iter()
        .map(|&tf| {
            let series = if tf == finest {
                candles.clone()
            } else {
                resample(&candles, finest, tf)
            };
            (tf, series)
        })
        .collect()
}

// ─── Dataset hash ────────────────────────────────────────────────────

/// Deterministic BLAKE3 over the symbol and every accepted candle.
pub fn compute_dataset_hash(data: &SimulationData) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data.symbol().as_bytes());
    for tf in data.timeframes() {
        let Some(series) = data.series(tf) else {
            continue;
        };
        hasher.update(tf.as_str().as_bytes());
        for c in series.candles() {
            hasher.update(&c.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(&c.open.to_le_bytes());
            hasher.update(&c.high.to_le_bytes());
            hasher.update(&c.low.to_le_bytes());
            hasher.update(&c.close.to_le_bytes());
            hasher.update(&c.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
