//! Signal: the evaluator's single output value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::Trend;
use crate::domain::{Direction, Side, Timeframe};
use crate::scoring::Contribution;

/// Why no trade was proposed. Each variant names the timeframe responsible
/// where there is one.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoSignalReason {
    #[error("anchor trend flat")]
    AnchorFlat,
    #[error("{timeframe} {trend} contradicts the anchor")]
    Contradiction { timeframe: Timeframe, trend: Trend },
    #[error("{timeframe} is overextended from its EMA")]
    Overextended { timeframe: Timeframe },
    #[error("confidence {confidence:.3} below threshold {threshold:.3}")]
    LowConfidence { confidence: f64, threshold: f64 },
    #[error("{timeframe} has {available} candles, needs {required}")]
    InsufficientData {
        timeframe: Timeframe,
        required: usize,
        available: usize,
    },
    #[error("{timeframe} data missing")]
    MissingTimeframe { timeframe: Timeframe },
    #[error("{timeframe} has no swing pivot for a stop")]
    NoSwingStructure { timeframe: Timeframe },
    #[error("{timeframe} stop {stop} is not on the loss side of entry {entry}")]
    InvalidStop {
        timeframe: Timeframe,
        stop: f64,
        entry: f64,
    },
    #[error("{timeframe} analysis failed: {detail}")]
    AnalysisFailed { timeframe: Timeframe, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub min: f64,
    pub max: f64,
}

impl EntryZone {
    /// Band of `±tolerance` around `center`.
    pub fn around(center: f64, tolerance: f64) -> Self {
        Self {
            min: center * (1.0 - tolerance),
            max: center * (1.0 + tolerance),
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub valid: bool,
    pub direction: Direction,
    pub confidence: f64,
    /// Human-readable cause chain, steps separated by "; ".
    pub reason: String,
    pub rejection: Option<NoSignalReason>,
    pub anchor_timeframe: Option<Timeframe>,
    pub entry_price: Option<f64>,
    pub entry_zone: Option<EntryZone>,
    pub stop_loss: Option<f64>,
    #[serde(with = "labeled")]
    pub targets: Vec<f64>,
    #[serde(with = "labeled")]
    pub risk_reward: Vec<f64>,
    pub contributions: Vec<Contribution>,
}

impl Signal {
    /// A NONE signal carrying whatever was established before rejection.
    pub fn none(
        rejection: NoSignalReason,
        steps: &[String],
        anchor_timeframe: Option<Timeframe>,
        confidence: f64,
        contributions: Vec<Contribution>,
    ) -> Self {
        let mut chain = steps.to_vec();
        chain.push(rejection.to_string());
        Self {
            valid: false,
            direction: Direction::None,
            confidence,
            reason: chain.join("; "),
            rejection: Some(rejection),
            anchor_timeframe,
            entry_price: None,
            entry_zone: None,
            stop_loss: None,
            targets: Vec::new(),
            risk_reward: Vec::new(),
            contributions,
        }
    }

    pub fn side(&self) -> Option<Side> {
        if self.valid {
            self.direction.side()
        } else {
            None
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `Vec<f64>` as an ordered object keyed `tp1..tpN`.
mod labeled {
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(values.len()))?;
        for (i, v) in values.iter().enumerate() {
            map.serialize_entry(&format!("tp{}", i + 1), v)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw: BTreeMap<String, f64> = BTreeMap::deserialize(deserializer)?;
        let mut indexed = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let index = key
                .strip_prefix("tp")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|&n| n >= 1)
                .ok_or_else(|| D::Error::custom(format!("unexpected target key '{key}'")))?;
            indexed.push((index, value));
        }
        indexed.sort_by_key(|(i, _)| *i);
        if indexed.iter().enumerate().any(|(pos, (i, _))| *i != pos + 1) {
            return Err(D::Error::custom("target keys must run tp1..tpN without gaps"));
        }
        Ok(indexed.into_iter().map(|(_, v)| v).collect())
    }
}
