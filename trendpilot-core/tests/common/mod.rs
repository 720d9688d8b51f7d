//! Shared synthetic data for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use trendpilot_core::domain::Bar;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
}

/// N hourly bars following a deterministic pseudo-random walk.
pub fn make_walk_bars(n: usize) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        // Deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.05;
        price += change;
        price = price.max(10.0);

        let open = price - 0.5;
        let close = price + 0.3;
        bars.push(Bar {
            timestamp: base_time() + Duration::hours(i as i64),
            open,
            high: open.max(close) + 2.0,
            low: open.min(close) - 2.0,
            close,
            volume: 1000.0 + i as f64 * 100.0,
        });
    }
    bars
}

/// Hourly bars from closes; open is the previous close, wicks are 1.0 wide.
pub fn make_close_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base_time() + Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Aggregate hourly bars into 4h bars labelled by their first hour.
pub fn resample_4h(bars_1h: &[Bar]) -> Vec<Bar> {
    bars_1h
        .chunks(4)
        .map(|c| Bar {
            timestamp: c[0].timestamp,
            open: c[0].open,
            high: c.iter().map(|b| b.high).fold(f64::MIN, f64::max),
            low: c.iter().map(|b| b.low).fold(f64::MAX, f64::min),
            close: c[c.len() - 1].close,
            volume: c.iter().map(|b| b.volume).sum(),
        })
        .collect()
}

/// Equality that treats two NaNs as equal.
pub fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}
