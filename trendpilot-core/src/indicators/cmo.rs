//! Chande Momentum Oscillator (CMO).
//!
//! delta[t] = close[t] - close[t-1]
//! up = rolling sum of positive deltas over `window`
//! down = rolling sum of |negative deltas| over `window`
//! CMO = 100 * (up - down) / (up + down)
//!
//! The first delta is undefined, so the first `window` positions have no
//! complete window. Those positions, and any position whose denominator is
//! zero or non-finite, are 0 rather than NaN. Output is bounded to [-100, 100].

use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Cmo {
    window: usize,
    name: String,
}

impl Cmo {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "CMO window must be >= 1");
        Self {
            window,
            name: format!("cmo_{window}"),
        }
    }
}

impl Indicator for Cmo {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        cmo_of_series(&closes(bars), self.window)
    }
}

/// CMO of an arbitrary series.
pub fn cmo_of_series(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![0.0; n];

    if window == 0 || n <= window {
        return result;
    }

    let mut deltas = vec![f64::NAN; n];
    for i in 1..n {
        deltas[i] = values[i] - values[i - 1];
    }

    for i in window..n {
        let span = &deltas[i + 1 - window..=i];
        if span.iter().any(|d| d.is_nan()) {
            continue;
        }
        let up: f64 = span.iter().map(|d| d.max(0.0)).sum();
        let down: f64 = span.iter().map(|d| (-d).max(0.0)).sum();
        let denom = up + down;
        if denom == 0.0 || !denom.is_finite() {
            continue;
        }
        let cmo = 100.0 * (up - down) / denom;
        if cmo.is_finite() {
            result[i] = cmo;
        }
    }

    result
}
