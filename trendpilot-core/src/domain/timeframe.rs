//! Bar timeframe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar duration, expressed in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timeframe {
    hours: u32,
}

impl Timeframe {
    pub const ONE_HOUR: Timeframe = Timeframe { hours: 1 };
    pub const FOUR_HOURS: Timeframe = Timeframe { hours: 4 };

    pub fn hours(hours: u32) -> Self {
        Self { hours: hours.max(1) }
    }

    /// Calendar days of history to request so that at least `lookback` bars
    /// come back, allowing 50% slack for gaps plus two days of margin.
    ///
    /// Only the 1h and 4h timeframes have an estimate; anything else asks
    /// for a fixed 30 days.
    pub fn days_for_lookback(self, lookback: usize) -> i64 {
        match self.hours {
            1 | 4 => ((lookback as f64 * f64::from(self.hours) * 1.5) / 24.0) as i64 + 2,
            _ => 30,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hour", self.hours)
    }
}
