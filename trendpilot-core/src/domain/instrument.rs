use serde::{Deserialize, Serialize};

/// Asset class of the traded instrument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    #[default]
    Crypto,
    Equity,
}

/// The one instrument the bot manages.
///
/// `always_open` instruments skip the market-hours check; `fractional`
/// instruments may be traded in non-integer quantities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub always_open: bool,
    pub fractional: bool,
}

impl Instrument {
    /// Instrument with the trading calendar and unit policy implied by its asset class:
    /// crypto trades 24/7 in fractional units, equities trade whole shares on a schedule.
    pub fn new(symbol: impl Into<String>, asset_class: AssetClass) -> Self {
        let crypto = asset_class == AssetClass::Crypto;
        Self {
            symbol: symbol.into(),
            asset_class,
            always_open: crypto,
            fractional: crypto,
        }
    }

    /// Round a quantity down to the instrument's tradable unit.
    pub fn round_quantity(&self, qty: f64) -> f64 {
        if self.fractional {
            qty.max(0.0)
        } else {
            qty.floor().max(0.0)
        }
    }
}
