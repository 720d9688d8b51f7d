//! Domain types for the decision pipeline

pub mod bar;
pub mod direction;
pub mod instrument;
pub mod timeframe;

pub use bar::{canonicalize_bars, Bar};
pub use direction::{entry_dir, Direction};
pub use instrument::{AssetClass, Instrument};
pub use timeframe::Timeframe;
