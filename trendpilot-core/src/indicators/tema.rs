//! Triple Exponential Moving Average (TEMA).
//!
//! ema1 = EMA(close), ema2 = EMA(ema1), ema3 = EMA(ema2),
//! TEMA = 3 * (ema1 - ema2) + ema3, each EMA with alpha = 2 / (window + 1).
//! Lookback: 0 (defined from the first bar).

use super::ema::ema_of_series;
use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Tema {
    window: usize,
    name: String,
}

impl Tema {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "TEMA window must be >= 1");
        Self {
            window,
            name: format!("tema_{window}"),
        }
    }
}

impl Indicator for Tema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        tema_of_series(&closes(bars), self.window)
    }
}

/// TEMA of an arbitrary series.
pub fn tema_of_series(values: &[f64], window: usize) -> Vec<f64> {
    let ema1 = ema_of_series(values, window);
    let ema2 = ema_of_series(&ema1, window);
    let ema3 = ema_of_series(&ema2, window);

    ema1.iter()
        .zip(&ema2)
        .zip(&ema3)
        .map(|((e1, e2), e3)| 3.0 * (e1 - e2) + e3)
        .collect()
}
