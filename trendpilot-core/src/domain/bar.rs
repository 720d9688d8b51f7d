//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for one instrument on one timeframe.
///
/// `timestamp` is the bar's UTC label as delivered by the data provider.
/// Within a series timestamps are unique and strictly increasing
/// (see [`canonicalize_bars`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLCV sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

/// Sort ascending by timestamp, drop duplicate timestamps (first wins) and
/// void bars.
///
/// The result satisfies the series invariant every downstream component
/// relies on: strictly increasing UTC timestamps.
pub fn canonicalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.retain(|b| !b.is_void());
    // Stable sort keeps provider order among equal timestamps, so dedup keeps the first.
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    bars
}
