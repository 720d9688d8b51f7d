//! Position sizing.
//!
//! Equity and volatility give a base quantity; momentum strength scales it
//! down towards a floor. Bracket exits sit a fixed number of ATRs away from
//! the reference close.

use serde::Serialize;

use crate::domain::{Direction, Instrument};
use crate::params::SizingParams;

/// Lower bound on the momentum threshold used for scaling.
const MIN_MOMENTUM_THRESHOLD: f64 = 10.0;

/// Take-profit and stop-loss prices for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BracketLevels {
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl BracketLevels {
    /// Levels for an entry at `close`, rounded to cents.
    pub fn new(direction: Direction, close: f64, atr: f64, params: &SizingParams) -> Self {
        let tp_dist = params.take_profit_atr_mult * atr;
        let sl_dist = params.atr_trail_mult * atr;
        let (take_profit, stop_loss) = match direction {
            Direction::Long => (close + tp_dist, close - sl_dist),
            Direction::Short => (close - tp_dist, close + sl_dist),
        };
        Self {
            take_profit: round_cents(take_profit),
            stop_loss: round_cents(stop_loss),
        }
    }
}

/// A fully sized entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingDecision {
    pub direction: Direction,
    pub quantity: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
}

/// Base quantity from equity and ATR, before momentum scaling.
///
/// Returns 0 when ATR is undefined or below `min_atr`, or when the price is
/// not positive.
pub fn atr_position_size(
    equity: f64,
    atr: f64,
    price: f64,
    params: &SizingParams,
    instrument: &Instrument,
) -> f64 {
    if atr.is_nan() || atr < params.min_atr || price <= 0.0 {
        return 0.0;
    }
    let dollar_risk = equity * params.vol_target;
    // ATR-normalised risk at a 0.75 scale.
    let raw = dollar_risk / (atr * 4.0) * 3.0;
    let capped = raw.min(params.max_qty).min(equity / price);
    instrument.round_quantity(capped)
}

/// Size multiplier in `[floor, 1]` from the lagged CMO reading.
///
/// An undefined CMO gives the floor.
pub fn momentum_multiplier(cmo_prev: f64, cmo_threshold: f64, floor: f64) -> f64 {
    if cmo_prev.is_nan() {
        return floor;
    }
    let effective = cmo_threshold.max(MIN_MOMENTUM_THRESHOLD);
    (cmo_prev.abs() / effective).min(1.0).max(floor)
}

/// True when ATR relative to price exceeds the spike cap.
pub fn volatility_spike(atr: f64, price: f64, cap: f64) -> bool {
    price > 0.0 && atr / price > cap
}

/// Full sizing decision, or `None` when the quantity comes out as zero.
#[allow(clippy::too_many_arguments)]
pub fn size_entry(
    direction: Direction,
    equity: f64,
    atr: f64,
    close: f64,
    cmo_prev: f64,
    cmo_threshold: f64,
    params: &SizingParams,
    instrument: &Instrument,
) -> Option<SizingDecision> {
    let base = atr_position_size(equity, atr, close, params, instrument);
    if base <= 0.0 {
        return None;
    }
    let mult = momentum_multiplier(cmo_prev, cmo_threshold, params.cmo_size_floor);
    let quantity = (base * mult).min(params.max_qty);
    if quantity.is_nan() || quantity <= 0.0 {
        return None;
    }
    let levels = BracketLevels::new(direction, close, atr, params);
    Some(SizingDecision {
        direction,
        quantity,
        take_profit: levels.take_profit,
        stop_loss: levels.stop_loss,
    })
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
