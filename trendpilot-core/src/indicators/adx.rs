//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. +DM = up move when it is positive and larger than the down move, else 0;
//!    -DM symmetric. Both are 0 on the first bar.
//! 2. Smooth TR, +DM and -DM with Wilder's RMA (alpha = 1/window, mean seed)
//! 3. +DI = 100 * RMA(+DM) / RMA(TR), -DI = 100 * RMA(-DM) / RMA(TR)
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), undefined when the sum is zero
//! 5. ADX = RMA(DX)
//!
//! Warm-up is NaN, never zero-filled. With clean input the DI series become
//! defined at index window-1 and the ADX at index 2*(window-1).

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct AdxWilder {
    window: usize,
    name: String,
}

impl AdxWilder {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "ADX window must be >= 1");
        Self {
            window,
            name: format!("adx_{window}"),
        }
    }
}

/// All intermediate series of the Wilder ADX.
#[derive(Debug, Clone, Default)]
pub struct DirectionalIndex {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub dx: Vec<f64>,
    pub adx: Vec<f64>,
}

/// Compute +DI, -DI, DX and ADX for a bar series.
///
/// Seeding is two-stage: TR and DM are RMA-seeded at index `window - 1`, so
/// +DI, -DI and DX start there, and the ADX is an RMA over that DX series. Its
/// own seed needs `window` defined DX values, which puts the first ADX at index
/// `2 * (window - 1)`. Everything earlier is NaN.
pub fn directional_index(bars: &[Bar], window: usize) -> DirectionalIndex {
    let n = bars.len();

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];

    for i in 1..n {
        let up_move = bars[i].high - bars[i - 1].high;
        let down_move = bars[i - 1].low - bars[i].low;

        if up_move.is_nan() || down_move.is_nan() {
            plus_dm[i] = f64::NAN;
            minus_dm[i] = f64::NAN;
            continue;
        }
        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }

    let smooth_tr = wilder_smooth(&true_range(bars), window);
    let smooth_plus = wilder_smooth(&plus_dm, window);
    let smooth_minus = wilder_smooth(&minus_dm, window);

    let mut plus_di = vec![f64::NAN; n];
    let mut minus_di = vec![f64::NAN; n];
    let mut dx = vec![f64::NAN; n];

    for i in 0..n {
        let tr = smooth_tr[i];
        if tr.is_nan() || tr == 0.0 || smooth_plus[i].is_nan() || smooth_minus[i].is_nan() {
            continue;
        }
        plus_di[i] = 100.0 * smooth_plus[i] / tr;
        minus_di[i] = 100.0 * smooth_minus[i] / tr;

        let di_sum = plus_di[i] + minus_di[i];
        if di_sum != 0.0 {
            dx[i] = 100.0 * (plus_di[i] - minus_di[i]).abs() / di_sum;
        }
    }

    let adx = wilder_smooth(&dx, window);

    DirectionalIndex {
        plus_di,
        minus_di,
        dx,
        adx,
    }
}

impl Indicator for AdxWilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * (self.window - 1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        directional_index(bars, self.window).adx
    }
}
