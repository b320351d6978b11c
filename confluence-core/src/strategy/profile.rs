//! Strategy profiles: which timeframes gate, confirm, time and stop a signal.
//!
//! `ProfileConfig` is the raw serde shape (TOML or JSON). It becomes a
//! `StrategyProfile` only through `TryFrom`, which rejects every malformed
//! field up front. Evaluation code only ever sees validated profiles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::analysis::DEFAULT_ENTRY_TOLERANCE_PCT;
use crate::domain::Timeframe;
use crate::scoring::{ConfluenceWeights, WeightError};

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("profile name must not be empty")]
    EmptyName,
    #[error("profile '{0}' has no anchor timeframes")]
    NoAnchors(String),
    #[error("profile '{profile}' lists {timeframe} more than once in {group}")]
    DuplicateTimeframe {
        profile: String,
        group: &'static str,
        timeframe: Timeframe,
    },
    #[error("min_confidence must be in (0, 1], got {0}")]
    MinConfidence(f64),
    #[error("profile '{0}' has no risk/reward targets")]
    NoTargets(String),
    #[error("risk/reward targets must be positive, finite and strictly increasing: {0:?}")]
    InvalidTargets(Vec<f64>),
    #[error("entry_tolerance_pct must be positive and finite, got {0}")]
    Tolerance(f64),
    #[error(transparent)]
    Weights(#[from] WeightError),
    #[error("unknown profile '{0}' (expected fast, medium or slow)")]
    UnknownKind(String),
}

// ─── Built-in kinds ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Scalp: 1h/15m gate, 5m timing.
    Fast,
    /// Swing: 4h/1h gate, 15m timing.
    Medium,
    /// Position: 1d/4h gate, 1h timing.
    Slow,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 3] = [ProfileKind::Fast, ProfileKind::Medium, ProfileKind::Slow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
        }
    }

    pub fn config(self) -> ProfileConfig {
        use Timeframe::*;
        let (anchors, confirm, entry, stop, min_confidence, targets) = match self {
            Self::Fast => (vec![H1, M15], vec![M15], vec![M5], M5, 0.55, vec![1.0, 2.0]),
            Self::Medium => (vec![H4, H1], vec![H1], vec![M15], H1, 0.60, vec![1.0, 2.0, 3.0]),
            Self::Slow => (vec![D1, H4], vec![H4], vec![H1], H4, 0.65, vec![1.5, 3.0]),
        };
        ProfileConfig {
            name: self.as_str().to_string(),
            anchor_timeframes: anchors,
            confirm_timeframes: confirm,
            entry_timeframes: entry,
            min_confidence,
            risk_reward_targets: targets,
            stop_loss_timeframe: stop,
            entry_tolerance_pct: None,
            weights: ConfluenceWeights::default(),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" | "scalp" => Ok(Self::Fast),
            "medium" | "swing" => Ok(Self::Medium),
            "slow" | "position" => Ok(Self::Slow),
            _ => Err(ProfileError::UnknownKind(s.to_string())),
        }
    }
}

// ─── Raw config ──────────────────────────────────────────────────────

/// Unvalidated profile as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,
    pub anchor_timeframes: Vec<Timeframe>,
    #[serde(default)]
    pub confirm_timeframes: Vec<Timeframe>,
    #[serde(default)]
    pub entry_timeframes: Vec<Timeframe>,
    pub min_confidence: f64,
    pub risk_reward_targets: Vec<f64>,
    pub stop_loss_timeframe: Timeframe,
    /// Must match the analysis tolerance when set; unset takes the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_tolerance_pct: Option<f64>,
    #[serde(default)]
    pub weights: ConfluenceWeights,
}

// ─── Validated profile ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyProfile {
    name: String,
    anchor_timeframes: Vec<Timeframe>,
    confirm_timeframes: Vec<Timeframe>,
    entry_timeframes: Vec<Timeframe>,
    min_confidence: f64,
    risk_reward_targets: Vec<f64>,
    stop_loss_timeframe: Timeframe,
    entry_tolerance_pct: f64,
    weights: ConfluenceWeights,
}

impl StrategyProfile {
    /// One of the built-in profiles.
    pub fn builtin(kind: ProfileKind) -> Self {
        let c = kind.config();
        Self {
            name: c.name,
            anchor_timeframes: c.anchor_timeframes,
            confirm_timeframes: c.confirm_timeframes,
            entry_timeframes: c.entry_timeframes,
            min_confidence: c.min_confidence,
            risk_reward_targets: c.risk_reward_targets,
            stop_loss_timeframe: c.stop_loss_timeframe,
            entry_tolerance_pct: DEFAULT_ENTRY_TOLERANCE_PCT,
            weights: c.weights,
        }
    }

    /// Same profile with its entry zone widened or narrowed to `pct`.
    pub fn with_entry_tolerance(mut self, pct: f64) -> Self {
        self.entry_tolerance_pct = pct;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gatekeeper timeframes in priority order. Never empty.
    pub fn anchor_timeframes(&self) -> &[Timeframe] {
        &self.anchor_timeframes
    }

    /// The first anchor; the simulator steps over its candles.
    pub fn primary_anchor(&self) -> Timeframe {
        self.anchor_timeframes[0]
    }

    pub fn confirm_timeframes(&self) -> &[Timeframe] {
        &self.confirm_timeframes
    }

    pub fn entry_timeframes(&self) -> &[Timeframe] {
        &self.entry_timeframes
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// R multiples for tp1..tpN, strictly increasing.
    pub fn risk_reward_targets(&self) -> &[f64] {
        &self.risk_reward_targets
    }

    pub fn stop_loss_timeframe(&self) -> Timeframe {
        self.stop_loss_timeframe
    }

    pub fn entry_tolerance_pct(&self) -> f64 {
        self.entry_tolerance_pct
    }

    pub fn weights(&self) -> &ConfluenceWeights {
        &self.weights
    }

    /// Every timeframe the profile reads, finest first.
    pub fn timeframes(&self) -> BTreeSet<Timeframe> {
        self.anchor_timeframes
            .iter()
            .chain(&self.confirm_timeframes)
            .chain(&self.entry_timeframes)
            .copied()
            .chain(std::iter::once(self.stop_loss_timeframe))
            .collect()
    }

    pub fn to_config(&self) -> ProfileConfig {
        ProfileConfig {
            name: self.name.clone(),
            anchor_timeframes: self.anchor_timeframes.clone(),
            confirm_timeframes: self.confirm_timeframes.clone(),
            entry_timeframes: self.entry_timeframes.clone(),
            min_confidence: self.min_confidence,
            risk_reward_targets: self.risk_reward_targets.clone(),
            stop_loss_timeframe: self.stop_loss_timeframe,
            entry_tolerance_pct: Some(self.entry_tolerance_pct),
            weights: self.weights.clone(),
        }
    }
}

impl TryFrom<ProfileConfig> for StrategyProfile {
    type Error = ProfileError;

    fn try_from(c: ProfileConfig) -> Result<Self, Self::Error> {
        let name = c.name.trim().to_string();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if c.anchor_timeframes.is_empty() {
            return Err(ProfileError::NoAnchors(name));
        }
        for (group, list) in [
            ("anchor_timeframes", &c.anchor_timeframes),
            ("confirm_timeframes", &c.confirm_timeframes),
            ("entry_timeframes", &c.entry_timeframes),
        ] {
            let mut seen = BTreeSet::new();
            if let Some(&timeframe) = list.iter().find(|tf| !seen.insert(**tf)) {
                return Err(ProfileError::DuplicateTimeframe {
                    profile: name,
                    group,
                    timeframe,
                });
            }
        }
        if !(c.min_confidence > 0.0 && c.min_confidence <= 1.0) {
            return Err(ProfileError::MinConfidence(c.min_confidence));
        }
        if c.risk_reward_targets.is_empty() {
            return Err(ProfileError::NoTargets(name));
        }
        let targets_ok = c.risk_reward_targets.iter().all(|r| r.is_finite() && *r > 0.0)
            && c.risk_reward_targets.windows(2).all(|w| w[0] < w[1]);
        if !targets_ok {
            return Err(ProfileError::InvalidTargets(c.risk_reward_targets));
        }
        let entry_tolerance_pct = c.entry_tolerance_pct.unwrap_or(DEFAULT_ENTRY_TOLERANCE_PCT);
        if !(entry_tolerance_pct.is_finite() && entry_tolerance_pct > 0.0) {
            return Err(ProfileError::Tolerance(entry_tolerance_pct));
        }
        c.weights.validate()?;

        Ok(Self {
            name,
            anchor_timeframes: c.anchor_timeframes,
            confirm_timeframes: c.confirm_timeframes,
            entry_timeframes: c.entry_timeframes,
            min_confidence: c.min_confidence,
            risk_reward_targets: c.risk_reward_targets,
            stop_loss_timeframe: c.stop_loss_timeframe,
            entry_tolerance_pct,
            weights: c.weights,
        })
    }
}

impl From<ProfileKind> for StrategyProfile {
    fn from(kind: ProfileKind) -> Self {
        Self::builtin(kind)
    }
}
