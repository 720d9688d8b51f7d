//! Per-timeframe indicator frames.
//!
//! Indicators are computed once per cycle over the whole fetched history and
//! stored column-wise, aligned 1:1 with the bars they were computed from.

use chrono::{DateTime, Utc};

use crate::domain::Bar;
use crate::indicators::{closes, directional_index, tema_of_series, Atr, Cmo, Indicator};
use crate::params::StrategyParams;

/// Low-timeframe (1h) bars and their indicators.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    pub bars: Vec<Bar>,
    pub tema_fast: Vec<f64>,
    pub tema_slow: Vec<f64>,
    pub adx: Vec<f64>,
    pub cmo: Vec<f64>,
    pub atr: Vec<f64>,
}

impl IndicatorFrame {
    pub fn compute_low(bars: &[Bar], params: &StrategyParams) -> Self {
        let close = closes(bars);
        Self {
            bars: bars.to_vec(),
            tema_fast: tema_of_series(&close, params.tema_fast_1h),
            tema_slow: tema_of_series(&close, params.tema_slow_1h),
            adx: directional_index(bars, params.adx_window).adx,
            cmo: Cmo::new(params.cmo_window).compute(bars),
            atr: Atr::new(params.atr_window).compute(bars),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Higher-timeframe (4h) trend fields.
#[derive(Debug, Clone, Default)]
pub struct HigherTimeframeFrame {
    pub timestamps: Vec<DateTime<Utc>>,
    pub tema_fast: Vec<f64>,
    pub tema_slow: Vec<f64>,
}

impl HigherTimeframeFrame {
    pub fn compute(bars: &[Bar], params: &StrategyParams) -> Self {
        let close = closes(bars);
        Self {
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            tema_fast: tema_of_series(&close, params.tema_fast_4h),
            tema_slow: tema_of_series(&close, params.tema_slow_4h),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
