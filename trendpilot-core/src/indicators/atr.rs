//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); the first
//! bar has no previous close and uses high-low.
//! ATR is the simple moving average of the true range over `window` bars
//! (not Wilder smoothing). Lookback: window - 1.
//!
//! Wilder smoothing lives here too because the ADX builds on the same true
//! range series.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    window: usize,
    name: String,
}

impl Atr {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "ATR window must be >= 1");
        Self {
            window,
            name: format!("atr_{window}"),
        }
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    let (h, l) = (bars[0].high, bars[0].low);
    if !h.is_nan() && !l.is_nan() {
        tr[0] = h - l;
    }

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() {
            continue;
        }
        if pc.is_nan() {
            tr[i] = h - l;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// Trailing simple mean over `window` values; NaN until a full window of
/// defined values is available.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let span = &values[i + 1 - window..=i];
        if span.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = span.iter().sum::<f64>() / window as f64;
    }

    result
}

/// Apply Wilder smoothing (RMA) to a series. Alpha = 1/period.
///
/// Seed: the simple mean of the first `period` consecutive defined values,
/// placed at the last index of that run. Everything before the seed is NaN.
/// After seeding, a NaN input repeats the previous smoothed value.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    // First index where `period` consecutive defined values start
    let mut run = 0;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
            continue;
        }
        run += 1;
        if run == period {
            seed_end = Some(i + 1);
            break;
        }
    }

    let seed_end = match seed_end {
        Some(e) => e,
        None => return result,
    };

    let seed: f64 = values[seed_end - period..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;

    for i in seed_end..n {
        if !values[i].is_nan() {
            prev = alpha * values[i] + (1.0 - alpha) * prev;
        }
        result[i] = prev;
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&true_range(bars), self.window)
    }
}
