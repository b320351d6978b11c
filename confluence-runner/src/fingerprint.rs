//! Run fingerprinting: deterministic identity of a backtest.
//!
//! - `profile_hash`: the validated strategy profile
//! - `analysis_hash`: indicator and classification parameters
//! - `dataset_hash`: every candle the run could read (see `data_loader`)
//! - `run_id`: all of the above plus the simulator knobs
//!
//! Hashes are BLAKE3 over the canonical JSON of each part. Struct fields
//! serialize in declaration order, so the JSON is stable across runs.

use serde::{Deserialize, Serialize};

use confluence_core::analysis::AnalysisConfig;
use confluence_core::backtest::BacktestConfig;
use confluence_core::strategy::StrategyProfile;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: String,
    pub profile_hash: String,
    pub analysis_hash: String,
    pub dataset_hash: String,
}

impl RunFingerprint {
    pub fn compute(
        profile: &StrategyProfile,
        analysis: &AnalysisConfig,
        backtest: &BacktestConfig,
        dataset_hash: &str,
    ) -> Result<Self, serde_json::Error> {
        let profile_hash = hash_json(profile)?;
        let analysis_hash = hash_json(analysis)?;
        let backtest_hash = hash_json(backtest)?;

        let mut hasher = blake3::Hasher::new();
        for part in [&profile_hash, &analysis_hash, &backtest_hash] {
            hasher.update(part.as_bytes());
        }
        hasher.update(dataset_hash.as_bytes());

        Ok(Self {
            run_id: hasher.finalize().to_hex().to_string(),
            profile_hash,
            analysis_hash,
            dataset_hash: dataset_hash.to_string(),
        })
    }

    /// First 12 hex characters of the run id, for directory names and logs.
    pub fn short_id(&self) -> &str {
        &self.run_id[..self.run_id.len().min(12)]
    }
}

fn hash_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}
