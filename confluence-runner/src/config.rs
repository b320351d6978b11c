//! Run configuration loaded from TOML.
//!
//! ```toml
//! [run]
//! symbols = ["BTCUSDT", "ETHUSDT"]
//! profiles = ["medium", "slow"]   # built-in names; or a [profile] table
//! exit_target = 1
//! warmup_bars = 0
//!
//! [analysis]                      # optional, every field defaults
//! entry_tolerance_pct = 0.004
//!
//! [data]
//! dir = "data"                    # <symbol>_<timeframe>.csv
//! # synthetic = true
//! # seed = 42
//! # bars = 500
//! ```
//!
//! Every check happens in `validate()`, which `from_toml_str` and `load`
//! call. Nothing downstream re-validates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use confluence_core::analysis::{AnalysisConfig, AnalysisConfigError};
use confluence_core::backtest::{BacktestConfig, BacktestError};
use confluence_core::strategy::{ProfileConfig, ProfileError, ProfileKind, StrategyProfile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no symbols configured: set [run].symbol or [run].symbols")]
    NoSymbols,
    #[error("symbol '{0}' listed more than once")]
    DuplicateSymbol(String),
    #[error("no strategy profile: set [run].profile, [run].profiles or a [profile] table")]
    NoProfile,
    #[error("[data] needs exactly one source: a csv `dir` or `synthetic = true`")]
    DataSource,
    #[error("[data].bars must be at least 1")]
    SyntheticBars,
    #[error(
        "[profile] '{profile}' sets entry_tolerance_pct {profile_pct}, but [analysis] uses {analysis_pct}"
    )]
    ToleranceMismatch {
        profile: String,
        profile_pct: f64,
        analysis_pct: f64,
    },
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Analysis(#[from] AnalysisConfigError),
    #[error(transparent)]
    Backtest(#[from] BacktestError),
}

// ─── Sections ────────────────────────────────────────────────────────

fn default_exit_target() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Built-in profile name (fast, medium, slow or an alias).
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default = "default_exit_target")]
    pub exit_target: usize,
    #[serde(default)]
    pub warmup_bars: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Csv,
}

fn default_seed() -> u64 {
    42
}

fn default_bars() -> usize {
    500
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding `<symbol>_<timeframe>.csv` files.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub format: DataFormat,
    #[serde(default)]
    pub synthetic: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Synthetic length, counted in candles of the coarsest requested timeframe.
    #[serde(default = "default_bars")]
    pub bars: usize,
}

impl DataConfig {
    pub fn csv(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            format: DataFormat::Csv,
            synthetic: false,
            seed: default_seed(),
            bars: default_bars(),
        }
    }

    pub fn synthetic(seed: u64, bars: usize) -> Self {
        Self {
            dir: None,
            format: DataFormat::Csv,
            synthetic: true,
            seed,
            bars,
        }
    }
}

// ─── RunConfig ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunSection,
    /// Custom profile, used instead of or alongside the built-in names.
    #[serde(default)]
    pub profile: Option<ProfileConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub data: DataConfig,
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let symbols = self.symbols();
        if symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        for (i, s) in symbols.iter().enumerate() {
            if symbols[..i].contains(s) {
                return Err(ConfigError::DuplicateSymbol(s.clone()));
            }
        }
        self.profiles()?;
        self.analysis.validate()?;
        self.backtest_config().validate()?;
        match (&self.data.dir, self.data.synthetic) {
            (Some(_), false) => {}
            (None, true) if self.data.bars == 0 => return Err(ConfigError::SyntheticBars),
            (None, true) => {}
            _ => return Err(ConfigError::DataSource),
        }
        Ok(())
    }

    /// `symbol` first, then `symbols`, trimmed.
    pub fn symbols(&self) -> Vec<String> {
        self.run
            .symbol
            .iter()
            .chain(&self.run.symbols)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Built-in names in listed order, then the custom `[profile]` table.
    ///
    /// Every profile takes `[analysis].entry_tolerance_pct`. A custom table may
    /// repeat it but not contradict it.
    pub fn profiles(&self) -> Result<Vec<StrategyProfile>, ConfigError> {
        let tolerance = self.analysis.entry_tolerance_pct;
        let mut out = Vec::new();
        for name in self.run.profile.iter().chain(&self.run.profiles) {
            let kind: ProfileKind = name.parse()?;
            out.push(StrategyProfile::builtin(kind).with_entry_tolerance(tolerance));
        }
        if let Some(custom) = &self.profile {
            let mut custom = custom.clone();
            match custom.entry_tolerance_pct {
                Some(pct) if pct != tolerance => {
                    return Err(ConfigError::ToleranceMismatch {
                        profile: custom.name,
                        profile_pct: pct,
                        analysis_pct: tolerance,
                    })
                }
                _ => custom.entry_tolerance_pct = Some(tolerance),
            }
            out.push(StrategyProfile::try_from(custom)?);
        }
        if out.is_empty() {
            return Err(ConfigError::NoProfile);
        }
        Ok(out)
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            warmup_bars: self.run.warmup_bars,
            exit_target: self.run.exit_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_core::domain::Timeframe;

    const BASIC: &str = r#"
        [run]
        symbol = "BTCUSDT"
        profile = "medium"

        [data]
        dir = "data"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = RunConfig::from_toml_str(BASIC).unwrap();
        assert_eq!(config.symbols(), vec!["BTCUSDT".to_string()]);
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.backtest_config(), BacktestConfig::default());
        assert_eq!(config.data.format, DataFormat::Csv);
        let profiles = config.profiles().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].primary_anchor(), Timeframe::H4);
    }

    #[test]
    fn custom_profile_table() {
        let text = r#"
            [run]
            symbols = ["A", "B"]
            exit_target = 2

            [profile]
            name = "intraday"
            anchor_timeframes = ["1h"]
            entry_timeframes = ["15m"]
            min_confidence = 0.4
            risk_reward_targets = [1.0, 2.5]
            stop_loss_timeframe = "15m"

            [analysis]
            swing_lookback = 12

            [data]
            synthetic = true
            seed = 7
            bars = 200
        "#;
        let config = RunConfig::from_toml_str(text).unwrap();
        let profiles = config.profiles().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name(), "intraday");
        assert_eq!(config.analysis.swing_lookback, 12);
        assert_eq!(config.backtest_config().exit_target, 2);
        assert_eq!(config.data, DataConfig::synthetic(7, 200));
    }

    #[test]
    fn missing_profile_is_rejected() {
        let text = r#"
            [run]
            symbol = "A"
            [data]
            dir = "data"
        "#;
        assert!(matches!(
            RunConfig::from_toml_str(text),
            Err(ConfigError::NoProfile)
        ));
    }

    #[test]
    fn unknown_builtin_is_a_profile_error() {
        let text = BASIC.replace("medium", "turbo");
        assert!(matches!(
            RunConfig::from_toml_str(&text),
            Err(ConfigError::Profile(ProfileError::UnknownKind(_)))
        ));
    }

    #[test]
    fn data_needs_exactly_one_source() {
        let both = BASIC.replace("dir = \"data\"", "dir = \"data\"\nsynthetic = true");
        assert!(matches!(
            RunConfig::from_toml_str(&both),
            Err(ConfigError::DataSource)
        ));
        let neither = BASIC.replace("dir = \"data\"", "");
        assert!(matches!(
            RunConfig::from_toml_str(&neither),
            Err(ConfigError::DataSource)
        ));
    }

    #[test]
    fn invalid_analysis_and_exit_target() {
        let bad_analysis = format!("{BASIC}\n[analysis]\nema_fast_period = 300\n");
        assert!(matches!(
            RunConfig::from_toml_str(&bad_analysis),
            Err(ConfigError::Analysis(_))
        ));
        let bad_exit = BASIC.replace("profile = \"medium\"", "profile = \"medium\"\nexit_target = 0");
        assert!(matches!(
            RunConfig::from_toml_str(&bad_exit),
            Err(ConfigError::Backtest(BacktestError::ExitTarget(0)))
        ));
    }

    #[test]
    fn analysis_tolerance_reaches_every_profile() {
        let text = r#"
            [run]
            symbol = "A"
            profile = "fast"

            [profile]
            name = "custom"
            anchor_timeframes = ["1h"]
            min_confidence = 0.5
            risk_reward_targets = [1.0]
            stop_loss_timeframe = "1h"

            [analysis]
            entry_tolerance_pct = 0.006

            [data]
            synthetic = true
        "#;
        let config = RunConfig::from_toml_str(text).unwrap();
        let profiles = config.profiles().unwrap();
        assert_eq!(profiles.len(), 2);
        assert!(profiles.iter().all(|p| p.entry_tolerance_pct() == 0.006));

        let agreeing = text.replace(
            "stop_loss_timeframe = \"1h\"",
            "stop_loss_timeframe = \"1h\"\nentry_tolerance_pct = 0.006",
        );
        assert!(RunConfig::from_toml_str(&agreeing).is_ok());
    }

    #[test]
    fn contradicting_profile_tolerance_is_rejected() {
        let text = r#"
            [run]
            symbol = "A"

            [profile]
            name = "custom"
            anchor_timeframes = ["1h"]
            min_confidence = 0.5
            risk_reward_targets = [1.0]
            stop_loss_timeframe = "1h"
            entry_tolerance_pct = 0.01

            [data]
            synthetic = true
        "#;
        assert!(matches!(
            RunConfig::from_toml_str(text),
            Err(ConfigError::ToleranceMismatch { profile, profile_pct, analysis_pct })
                if profile == "custom" && profile_pct == 0.01 && analysis_pct == 0.004
        ));
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let text = BASIC.replace("symbol = \"BTCUSDT\"", "symbol = \"X\"\nsymbols = [\"X\"]");
        assert!(matches!(
            RunConfig::from_toml_str(&text),
            Err(ConfigError::DuplicateSymbol(s)) if s == "X"
        ));
    }
}
