//! Multi-timeframe fusion.
//!
//! Each low-timeframe row receives the most recent higher-timeframe reading
//! whose timestamp is at or before the row's timestamp (backward, inclusive
//! as-of join). Readings are held in a [`HigherTimeframeCache`] that only
//! advances when a higher-timeframe bar is reached, so a row can see a stale
//! reading but never a future one. Undefined fields in a new reading keep the
//! last defined value (forward fill).

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::Timeframe;
use crate::frame::{HigherTimeframeFrame, IndicatorFrame};

/// One higher-timeframe observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HigherTimeframeReading {
    /// Timestamp of the higher-timeframe bar the reading came from.
    pub timestamp: DateTime<Utc>,
    pub tema_fast: f64,
    pub tema_slow: f64,
}

/// Last known reading per higher timeframe.
#[derive(Debug, Clone, Default)]
pub struct HigherTimeframeCache {
    last: HashMap<Timeframe, HigherTimeframeReading>,
}

impl HigherTimeframeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly closed higher-timeframe bar.
    ///
    /// NaN fields keep the previously cached value.
    pub fn observe(&mut self, timeframe: Timeframe, reading: HigherTimeframeReading) {
        let merged = match self.last.get(&timeframe) {
            Some(prev) => HigherTimeframeReading {
                timestamp: reading.timestamp,
                tema_fast: fill(reading.tema_fast, prev.tema_fast),
                tema_slow: fill(reading.tema_slow, prev.tema_slow),
            },
            None => reading,
        };
        self.last.insert(timeframe, merged);
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&HigherTimeframeReading> {
        self.last.get(&timeframe)
    }
}

fn fill(value: f64, previous: f64) -> f64 {
    if value.is_nan() {
        previous
    } else {
        value
    }
}

/// Low-timeframe frame augmented with higher-timeframe fields.
#[derive(Debug, Clone, Default)]
pub struct FusedFrame {
    pub low: IndicatorFrame,
    pub timeframe: Option<Timeframe>,
    /// Source timestamp of the attached reading; `None` before the first one.
    pub htf_timestamp: Vec<Option<DateTime<Utc>>>,
    pub htf_tema_fast: Vec<f64>,
    pub htf_tema_slow: Vec<f64>,
}

impl FusedFrame {
    pub fn len(&self) -> usize {
        self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }
}

/// As-of join of `high` onto the timeline of `low`.
///
/// Both inputs must be in ascending timestamp order.
pub fn fuse(low: IndicatorFrame, high: &HigherTimeframeFrame, timeframe: Timeframe) -> FusedFrame {
    let n = low.len();
    let mut cache = HigherTimeframeCache::new();
    let mut htf_timestamp = Vec::with_capacity(n);
    let mut htf_tema_fast = Vec::with_capacity(n);
    let mut htf_tema_slow = Vec::with_capacity(n);

    let mut j = 0;
    for bar in &low.bars {
        while j < high.len() && high.timestamps[j] <= bar.timestamp {
            cache.observe(
                timeframe,
                HigherTimeframeReading {
                    timestamp: high.timestamps[j],
                    tema_fast: high.tema_fast[j],
                    tema_slow: high.tema_slow[j],
                },
            );
            j += 1;
        }

        match cache.get(timeframe) {
            Some(reading) => {
                htf_timestamp.push(Some(reading.timestamp));
                htf_tema_fast.push(reading.tema_fast);
                htf_tema_slow.push(reading.tema_slow);
            }
            None => {
                htf_timestamp.push(None);
                htf_tema_fast.push(f64::NAN);
                htf_tema_slow.push(f64::NAN);
            }
        }
    }

    FusedFrame {
        low,
        timeframe: Some(timeframe),
        htf_timestamp,
        htf_tema_fast,
        htf_tema_slow,
    }
}
