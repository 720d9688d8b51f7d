//! Signal state machine.
//!
//! A memoryless combinational machine sampled once per closed bar. Every
//! gating input is lagged by one bar and forward-filled; inputs that are still
//! undefined never trigger an entry.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{entry_dir, Bar, Direction, Timeframe};
use crate::frame::{HigherTimeframeFrame, IndicatorFrame};
use crate::fusion::{fuse, FusedFrame};
use crate::params::StrategyParams;

/// One fused row with its lagged gating fields and derived entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub atr: f64,
    pub tema_fast_1h: f64,
    pub tema_slow_1h: f64,
    pub tema_fast_4h: f64,
    pub tema_slow_4h: f64,
    pub adx: f64,
    pub cmo: f64,
    pub short_trend: Option<bool>,
    pub long_trend: Option<bool>,
    pub short_trend_prev: Option<bool>,
    pub long_trend_prev: Option<bool>,
    pub adx_prev: f64,
    pub adx_slope_prev: f64,
    pub cmo_prev: f64,
    pub long_signal: bool,
    pub short_signal: bool,
    pub entry: Option<Direction>,
}

impl SignalRow {
    /// Entry as the integer convention -1 / 0 / +1.
    pub fn entry_dir(&self) -> i8 {
        entry_dir(self.entry)
    }

    pub fn diagnostics(&self, params: &StrategyParams) -> GateDiagnostics {
        GateDiagnostics::evaluate(self, params)
    }
}

/// Which individual gate conditions hold for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GateDiagnostics {
    pub short_trend_up: bool,
    pub short_trend_down: bool,
    pub long_trend_up: bool,
    pub long_trend_down: bool,
    pub adx_strong: bool,
    pub adx_rising: bool,
    pub cmo_bullish: bool,
    pub cmo_bearish: bool,
}

impl GateDiagnostics {
    pub fn evaluate(row: &SignalRow, params: &StrategyParams) -> Self {
        Self::from_lagged(
            row.short_trend_prev,
            row.long_trend_prev,
            row.adx_prev,
            row.adx_slope_prev,
            row.cmo_prev,
            params,
        )
    }

    /// Gates over the lagged fields. NaN compares false, so undefined inputs
    /// never pass.
    fn from_lagged(
        short_trend_prev: Option<bool>,
        long_trend_prev: Option<bool>,
        adx_prev: f64,
        adx_slope_prev: f64,
        cmo_prev: f64,
        params: &StrategyParams,
    ) -> Self {
        Self {
            short_trend_up: short_trend_prev == Some(true),
            short_trend_down: short_trend_prev == Some(false),
            long_trend_up: long_trend_prev == Some(true),
            long_trend_down: long_trend_prev == Some(false),
            adx_strong: adx_prev > params.adx_threshold,
            adx_rising: adx_slope_prev > 0.0,
            cmo_bullish: cmo_prev > params.cmo_threshold,
            cmo_bearish: cmo_prev < -params.cmo_threshold,
        }
    }

    pub fn long_ok(&self) -> bool {
        self.short_trend_up && self.long_trend_up && self.strength_ok() && self.cmo_bullish
    }

    pub fn short_ok(&self) -> bool {
        self.short_trend_down && self.long_trend_down && self.strength_ok() && self.cmo_bearish
    }

    fn strength_ok(&self) -> bool {
        self.adx_strong && self.adx_rising
    }

    /// The gates that hold, joined by " / ", or "No gate satisfied".
    pub fn reason(&self) -> String {
        let gates = [
            ("1h&4h LONG trends", self.short_trend_up && self.long_trend_up),
            ("1h&4h SHORT trends", self.short_trend_down && self.long_trend_down),
            ("ADX_prev > thr", self.adx_strong),
            ("ADX_slope_prev > 0", self.adx_rising),
            ("CMO_prev > +thr", self.cmo_bullish),
            ("CMO_prev < -thr", self.cmo_bearish),
        ];
        let passing: Vec<&str> = gates.iter().filter(|g| g.1).map(|g| g.0).collect();
        if passing.is_empty() {
            "No gate satisfied".to_string()
        } else {
            passing.join(" / ")
        }
    }
}

/// Full pipeline: indicators on both timeframes, fusion, then signals.
pub fn compute_signals(bars_1h: &[Bar], bars_4h: &[Bar], params: &StrategyParams) -> Vec<SignalRow> {
    let low = IndicatorFrame::compute_low(bars_1h, params);
    let high = HigherTimeframeFrame::compute(bars_4h, params);
    signals_from_fused(&fuse(low, &high, Timeframe::FOUR_HOURS), params)
}

/// Derive signal rows from an already fused frame.
pub fn signals_from_fused(fused: &FusedFrame, params: &StrategyParams) -> Vec<SignalRow> {
    let low = &fused.low;
    let n = fused.len();

    let short_trend: Vec<Option<bool>> = (0..n)
        .map(|i| trend(low.tema_fast[i], low.tema_slow[i]))
        .collect();
    let long_trend: Vec<Option<bool>> = (0..n)
        .map(|i| trend(fused.htf_tema_fast[i], fused.htf_tema_slow[i]))
        .collect();
    let adx_slope: Vec<f64> = (0..n)
        .map(|i| if i == 0 { f64::NAN } else { low.adx[i] - low.adx[i - 1] })
        .collect();

    let short_trend_prev = lag_flags(&short_trend);
    let long_trend_prev = lag_flags(&long_trend);
    let adx_prev = lag_values(&low.adx);
    let adx_slope_prev = lag_values(&adx_slope);
    let cmo_prev = lag_values(&low.cmo);

    (0..n)
        .map(|i| {
            let gates = GateDiagnostics::from_lagged(
                short_trend_prev[i],
                long_trend_prev[i],
                adx_prev[i],
                adx_slope_prev[i],
                cmo_prev[i],
                params,
            );
            let long_signal = gates.long_ok();
            let short_signal = gates.short_ok();
            // Long is checked first; the two cannot both hold.
            let entry = if long_signal {
                Some(Direction::Long)
            } else if short_signal {
                Some(Direction::Short)
            } else {
                None
            };

            let bar = &low.bars[i];
            SignalRow {
                timestamp: bar.timestamp,
                close: bar.close,
                atr: low.atr[i],
                tema_fast_1h: low.tema_fast[i],
                tema_slow_1h: low.tema_slow[i],
                tema_fast_4h: fused.htf_tema_fast[i],
                tema_slow_4h: fused.htf_tema_slow[i],
                adx: low.adx[i],
                cmo: low.cmo[i],
                short_trend: short_trend[i],
                long_trend: long_trend[i],
                short_trend_prev: short_trend_prev[i],
                long_trend_prev: long_trend_prev[i],
                adx_prev: adx_prev[i],
                adx_slope_prev: adx_slope_prev[i],
                cmo_prev: cmo_prev[i],
                long_signal,
                short_signal,
                entry,
            }
        })
        .collect()
}

fn trend(fast: f64, slow: f64) -> Option<bool> {
    if fast.is_nan() || slow.is_nan() {
        None
    } else {
        Some(fast > slow)
    }
}

/// Shift by one bar, then forward-fill undefined positions.
fn lag_flags(values: &[Option<bool>]) -> Vec<Option<bool>> {
    let mut out = Vec::with_capacity(values.len());
    let mut last = None;
    for i in 0..values.len() {
        if i > 0 && values[i - 1].is_some() {
            last = values[i - 1];
        }
        out.push(last);
    }
    out
}

/// Shift by one bar, then forward-fill NaN positions.
fn lag_values(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut last = f64::NAN;
    for i in 0..values.len() {
        if i > 0 && !values[i - 1].is_nan() {
            last = values[i - 1];
        }
        out.push(last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use chrono::Duration;

    fn four_hour_from(bars_1h: &[Bar]) -> Vec<Bar> {
        bars_1h
            .chunks(4)
            .filter(|c| c.len() == 4)
            .map(|c| Bar {
                timestamp: c[0].timestamp,
                open: c[0].open,
                high: c.iter().map(|b| b.high).fold(f64::MIN, f64::max),
                low: c.iter().map(|b| b.low).fold(f64::MAX, f64::min),
                close: c[3].close,
                volume: c.iter().map(|b| b.volume).sum(),
            })
            .collect()
    }

    fn flat_row() -> SignalRow {
        SignalRow {
            timestamp: make_bars(&[1.0])[0].timestamp,
            close: 100.0,
            atr: 1.0,
            tema_fast_1h: 1.0,
            tema_slow_1h: 1.0,
            tema_fast_4h: 1.0,
            tema_slow_4h: 1.0,
            adx: 30.0,
            cmo: 0.0,
            short_trend: None,
            long_trend: None,
            short_trend_prev: Some(true),
            long_trend_prev: Some(true),
            adx_prev: 30.0,
            adx_slope_prev: 1.0,
            cmo_prev: 50.0,
            long_signal: false,
            short_signal: false,
            entry: None,
        }
    }

    #[test]
    fn lag_shifts_then_fills() {
        let v = [f64::NAN, 1.0, f64::NAN, 3.0];
        let out = lag_values(&v);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_eq!(out[2], 1.0);
        assert_eq!(out[3], 1.0);

        let flags = [None, Some(true), None, Some(false)];
        assert_eq!(lag_flags(&flags), vec![None, None, Some(true), Some(true)]);
    }

    #[test]
    fn rising_closes_converge_to_uptrend() {
        let closes: Vec<f64> = (0..400).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let bars_1h = make_bars(&closes);
        let bars_4h = four_hour_from(&bars_1h);
        let rows = compute_signals(&bars_1h, &bars_4h, &StrategyParams::default());
        assert_eq!(rows.len(), 400);
        for row in &rows[10..] {
            assert_eq!(row.short_trend, Some(true));
            assert_eq!(row.long_trend, Some(true));
        }
    }

    #[test]
    fn falling_closes_never_go_long() {
        let closes: Vec<f64> = (0..400).map(|i| 1000.0 - i as f64).collect();
        let bars_1h = make_bars(&closes);
        let bars_4h = four_hour_from(&bars_1h);
        let rows = compute_signals(&bars_1h, &bars_4h, &StrategyParams::default());
        assert!(rows.iter().all(|r| !r.long_signal));
        assert!(rows.iter().all(|r| r.entry != Some(Direction::Long)));
    }

    #[test]
    fn first_row_never_triggers() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        let rows = compute_signals(&bars, &bars, &StrategyParams::default());
        assert_eq!(rows[0].short_trend_prev, None);
        assert!(rows[0].adx_prev.is_nan());
        assert_eq!(rows[0].entry_dir(), 0);
    }

    #[test]
    fn no_higher_timeframe_means_no_entry() {
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + (i as f64) * 2.0).collect();
        let bars_1h = make_bars(&closes);
        let rows = compute_signals(&bars_1h, &[], &StrategyParams::default());
        assert!(rows.iter().all(|r| r.long_trend.is_none() && r.entry.is_none()));
    }

    #[test]
    fn undefined_higher_trend_never_counts_as_down() {
        let mut high = make_bars(&[100.0; 4]);
        let base = make_bars(&[100.0])[0].timestamp;
        for (i, bar) in high.iter_mut().enumerate() {
            bar.timestamp = base + Duration::hours(1000 + i as i64);
        }
        let closes: Vec<f64> = (0..200).map(|i| 500.0 - (i as f64) * 2.0).collect();
        let rows = compute_signals(&make_bars(&closes), &high, &StrategyParams::default());
        assert!(rows.iter().all(|r| !r.short_signal));
    }

    #[test]
    fn diagnostics_report_failed_gates() {
        let params = StrategyParams::default();
        let row = flat_row();
        let diag = row.diagnostics(&params);
        assert!(diag.long_ok());
        assert!(!diag.short_ok());
        assert_eq!(
            diag.reason(),
            "1h&4h LONG trends / ADX_prev > thr / ADX_slope_prev > 0 / CMO_prev > +thr"
        );

        let weak = SignalRow {
            short_trend_prev: None,
            adx_prev: 10.0,
            adx_slope_prev: -1.0,
            cmo_prev: 5.0,
            ..flat_row()
        };
        assert_eq!(weak.diagnostics(&params).reason(), "No gate satisfied");
    }

    #[test]
    fn stored_signals_match_diagnostics() {
        let closes: Vec<f64> = (0..400)
            .map(|i| 100.0 + 10.0 * (i as f64 * 0.05).sin() + i as f64 * 0.1)
            .collect();
        let bars_1h = make_bars(&closes);
        let bars_4h = four_hour_from(&bars_1h);
        let params = StrategyParams::default();
        for row in compute_signals(&bars_1h, &bars_4h, &params) {
            let diag = row.diagnostics(&params);
            assert_eq!(row.long_signal, diag.long_ok());
            assert_eq!(row.short_signal, diag.short_ok());
        }
    }

    #[test]
    fn nan_inputs_fail_closed() {
        let params = StrategyParams::default();
        let row = SignalRow {
            adx_prev: f64::NAN,
            adx_slope_prev: f64::NAN,
            cmo_prev: f64::NAN,
            ..flat_row()
        };
        let diag = row.diagnostics(&params);
        assert!(!diag.adx_strong && !diag.adx_rising && !diag.cmo_bullish && !diag.cmo_bearish);
        assert!(!diag.long_ok() && !diag.short_ok());
    }
}
