//! Aggregate candles into a coarser timeframe.
//!
//! Buckets are aligned to the Unix epoch. A bucket is emitted only when the
//! candle that closes it is present, so a still-forming coarse candle never
//! appears in the output.

use chrono::{DateTime, Duration, Utc};

use super::candle::Candle;
use super::timeframe::Timeframe;

/// Start of the `tf` bucket containing `ts`.
pub fn bucket_start(ts: DateTime<Utc>, tf: Timeframe) -> DateTime<Utc> {
    let secs = tf.minutes() * 60;
    let offset = ts.timestamp().rem_euclid(secs);
    ts - Duration::seconds(offset)
}

/// Resample `candles` (strictly increasing, of timeframe `from`) into `to`.
///
/// Returns an empty vector when `to` is not coarser than `from`.
pub fn resample(candles: &[Candle], from: Timeframe, to: Timeframe) -> Vec<Candle> {
    if to <= from {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(candles.len() * from.minutes() as usize / to.minutes() as usize + 1);
    let mut current: Option<(DateTime<Utc>, Candle)> = None;

    for c in candles {
        let start = bucket_start(c.timestamp, to);
        match current.as_mut() {
            Some((bucket, agg)) if *bucket == start => {
                agg.high = agg.high.max(c.high);
                agg.low = agg.low.min(c.low);
                agg.close = c.close;
                agg.volume += c.volume;
                // remember the newest member in `timestamp` until the bucket is sealed
                agg.timestamp = c.timestamp;
            }
            _ => {
                if let Some(done) = current.take() {
                    push_if_complete(&mut out, done, from, to);
                }
                current = Some((start, *c));
            }
        }
    }
    if let Some(done) = current {
        push_if_complete(&mut out, done, from, to);
    }
    out
}

fn push_if_complete(
    out: &mut Vec<Candle>,
    (start, mut agg): (DateTime<Utc>, Candle),
    from: Timeframe,
    to: Timeframe,
) {
    let closes_bucket = agg.timestamp + from.duration() == start + to.duration();
    if closes_bucket {
        agg.timestamp = start;
        out.push(agg);
    }
}
