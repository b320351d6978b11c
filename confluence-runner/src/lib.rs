//! Confluence Runner — configuration, candle loading, batch backtests, export.
//!
//! This crate builds on `confluence-core` to provide:
//! - TOML run configuration with built-in or custom strategy profiles
//! - CSV and seeded synthetic candle loading
//! - Parallel (symbol × profile) backtests over shared read-only data
//! - One-shot latest-signal scans
//! - Run fingerprinting and JSON/CSV/Markdown artifacts

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod fingerprint;
pub mod runner;
pub mod scan;

pub use batch::{cartesian_jobs, run_batch, BatchJob, BatchOutcome};
pub use config::{ConfigError, DataConfig, DataFormat, RunConfig, RunSection};
pub use data_loader::{load_symbol, LoadError, LoadedData};
pub use fingerprint::RunFingerprint;
pub use runner::{
    run_backtests, run_backtests_with_cancel, scan_signals, BatchReport, RunError, RunFailure,
    RunReport, ScanReport, SCHEMA_VERSION,
};
pub use scan::{scan_latest, ScanEntry};
