//! Strategy, sizing and risk parameters.
//!
//! One immutable value of each is built at start-up from the configuration
//! file and handed to the component that needs it. Defaults are the
//! production settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter validation failure.
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("{field} must be >= 1")]
    ZeroWindow { field: &'static str },

    #[error("{fast} ({fast_value}) must be shorter than {slow} ({slow_value})")]
    WindowOrder {
        fast: &'static str,
        fast_value: usize,
        slow: &'static str,
        slow_value: usize,
    },

    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Indicator windows and entry thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub tema_fast_1h: usize,
    pub tema_slow_1h: usize,
    pub tema_fast_4h: usize,
    pub tema_slow_4h: usize,
    pub adx_window: usize,
    pub cmo_window: usize,
    pub atr_window: usize,
    pub adx_threshold: f64,
    pub cmo_threshold: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            tema_fast_1h: 10,
            tema_slow_1h: 80,
            tema_fast_4h: 20,
            tema_slow_4h: 70,
            adx_window: 14,
            cmo_window: 14,
            atr_window: 14,
            adx_threshold: 25.0,
            cmo_threshold: 20.0,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        for (field, value) in [
            ("tema_fast_1h", self.tema_fast_1h),
            ("tema_slow_1h", self.tema_slow_1h),
            ("tema_fast_4h", self.tema_fast_4h),
            ("tema_slow_4h", self.tema_slow_4h),
            ("adx_window", self.adx_window),
            ("cmo_window", self.cmo_window),
            ("atr_window", self.atr_window),
        ] {
            if value == 0 {
                return Err(ParamError::ZeroWindow { field });
            }
        }
        if self.tema_fast_1h >= self.tema_slow_1h {
            return Err(ParamError::WindowOrder {
                fast: "tema_fast_1h",
                fast_value: self.tema_fast_1h,
                slow: "tema_slow_1h",
                slow_value: self.tema_slow_1h,
            });
        }
        if self.tema_fast_4h >= self.tema_slow_4h {
            return Err(ParamError::WindowOrder {
                fast: "tema_fast_4h",
                fast_value: self.tema_fast_4h,
                slow: "tema_slow_4h",
                slow_value: self.tema_slow_4h,
            });
        }
        non_negative("adx_threshold", self.adx_threshold)?;
        non_negative("cmo_threshold", self.cmo_threshold)?;
        Ok(())
    }
}

/// Position sizing knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingParams {
    /// Fraction of equity put at risk per trade.
    pub vol_target: f64,
    /// Hard cap on order quantity.
    pub max_qty: f64,
    /// Entries are rejected below this ATR.
    pub min_atr: f64,
    /// Stop-loss distance in ATRs.
    pub atr_trail_mult: f64,
    /// Take-profit distance in ATRs.
    pub take_profit_atr_mult: f64,
    /// Entries are skipped when ATR / price exceeds this ratio.
    pub vol_spike_cap: f64,
    /// Minimum momentum size multiplier.
    pub cmo_size_floor: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            vol_target: 0.01,
            max_qty: 3.0,
            min_atr: 1.0,
            atr_trail_mult: 2.5,
            take_profit_atr_mult: 3.0,
            vol_spike_cap: 0.012,
            cmo_size_floor: 0.35,
        }
    }
}

impl SizingParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        positive("vol_target", self.vol_target)?;
        positive("max_qty", self.max_qty)?;
        non_negative("min_atr", self.min_atr)?;
        positive("atr_trail_mult", self.atr_trail_mult)?;
        positive("take_profit_atr_mult", self.take_profit_atr_mult)?;
        positive("vol_spike_cap", self.vol_spike_cap)?;
        if !(0.0..=1.0).contains(&self.cmo_size_floor) {
            return Err(ParamError::OutOfRange {
                field: "cmo_size_floor",
                value: self.cmo_size_floor,
                expected: "0.0..=1.0",
            });
        }
        Ok(())
    }
}

/// Daily drawdown guard knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    pub enable_daily_loss_guard: bool,
    pub max_daily_drawdown_pct: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            enable_daily_loss_guard: false,
            max_daily_drawdown_pct: 0.05,
        }
    }
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.max_daily_drawdown_pct > 0.0 && self.max_daily_drawdown_pct < 1.0) {
            return Err(ParamError::OutOfRange {
                field: "max_daily_drawdown_pct",
                value: self.max_daily_drawdown_pct,
                expected: "0.0 < x < 1.0",
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ParamError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParamError::OutOfRange {
            field,
            value,
            expected: "> 0",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ParamError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParamError::OutOfRange {
            field,
            value,
            expected: ">= 0",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(StrategyParams::default().validate().is_ok());
        assert!(SizingParams::default().validate().is_ok());
        assert!(RiskParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_window() {
        let p = StrategyParams {
            cmo_window: 0,
            ..StrategyParams::default()
        };
        assert_eq!(
            p.validate(),
            Err(ParamError::ZeroWindow { field: "cmo_window" })
        );
    }

    #[test]
    fn rejects_fast_not_shorter_than_slow() {
        let p = StrategyParams {
            tema_fast_4h: 70,
            ..StrategyParams::default()
        };
        assert!(matches!(p.validate(), Err(ParamError::WindowOrder { .. })));
    }

    #[test]
    fn rejects_floor_out_of_range() {
        let p = SizingParams {
            cmo_size_floor: 1.5,
            ..SizingParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_drawdown_out_of_range() {
        for pct in [0.0, 1.0, -0.1, f64::NAN] {
            let p = RiskParams {
                max_daily_drawdown_pct: pct,
                ..RiskParams::default()
            };
            assert!(p.validate().is_err(), "accepted {pct}");
        }
    }

    #[test]
    fn partial_toml_style_json_uses_defaults() {
        let p: SizingParams = serde_json::from_str(r#"{"max_qty": 5.0}"#).unwrap();
        assert_eq!(p.max_qty, 5.0);
        assert_eq!(p.vol_target, 0.01);
    }
}
