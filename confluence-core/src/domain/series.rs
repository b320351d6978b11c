//! CandleSeries — a validated, strictly time-ordered candle history.
//!
//! Construction drops malformed candles and records why; the only way to read
//! a historical window is `as_of`, which never returns a candle stamped after
//! the requested instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::candle::{Candle, CandleRejection};
use super::timeframe::Timeframe;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("{timeframe} series has no valid candles ({rejected} rejected)")]
    Empty { timeframe: Timeframe, rejected: usize },
}

/// A candle dropped during sanitization, with the position it had in the raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCandle {
    pub timeframe: Timeframe,
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub reason: CandleRejection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Validate raw candles, dropping malformed ones.
    ///
    /// A candle whose timestamp does not strictly exceed the last *accepted*
    /// candle is rejected, so duplicates keep their first occurrence.
    pub fn sanitize(
        timeframe: Timeframe,
        raw: Vec<Candle>,
    ) -> Result<(Self, Vec<RejectedCandle>), SeriesError> {
        let mut candles: Vec<Candle> = Vec::with_capacity(raw.len());
        let mut rejected = Vec::new();

        for (index, candle) in raw.into_iter().enumerate() {
            let reason = candle.defect().or_else(|| match candles.last() {
                Some(prev) if candle.timestamp <= prev.timestamp => {
                    Some(CandleRejection::NonIncreasingTimestamp)
                }
                _ => None,
            });

            match reason {
                Some(reason) => {
                    warn!(%timeframe, index, timestamp = %candle.timestamp, %reason, "dropping candle");
                    rejected.push(RejectedCandle {
                        timeframe,
                        index,
                        timestamp: candle.timestamp,
                        reason,
                    });
                }
                None => candles.push(candle),
            }
        }

        if candles.is_empty() {
            return Err(SeriesError::Empty {
                timeframe,
                rejected: rejected.len(),
            });
        }

        Ok((Self { timeframe, candles }, rejected))
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Candles with `timestamp <= at`, oldest first.
    pub fn as_of(&self, at: DateTime<Utc>) -> &[Candle] {
        let end = self.candles.partition_point(|c| c.timestamp <= at);
        &self.candles[..end]
    }
}
