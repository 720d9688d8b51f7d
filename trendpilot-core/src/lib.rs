//! Trendpilot Core: the synchronous decision core.
//!
//! - Domain types (bars, timeframes, directions, the traded instrument)
//! - Indicator library (TEMA, CMO, ATR, Wilder ADX)
//! - Indicator frames and lookahead-safe multi-timeframe fusion
//! - Signal state machine over lagged gating fields
//! - Position sizing and bracket levels
//! - Daily drawdown guard
//!
//! Nothing here performs I/O; the runner crate feeds bars in and acts on the
//! decisions that come out.

pub mod domain;
pub mod frame;
pub mod fusion;
pub mod indicators;
pub mod params;
pub mod risk;
pub mod signal;
pub mod sizing;
