//! Trendpilot Runner: the live side of the bot.
//!
//! This crate wraps `trendpilot-core` with everything that touches the outside
//! world:
//! - TOML configuration and environment credentials
//! - Market data sources (Alpaca REST, CSV files)
//! - Broker adapters (Alpaca REST, in-memory paper broker)
//! - Persisted bar marker and day equity anchor
//! - Append-only order log
//! - The per-bar decision loop

pub mod alpaca;
pub mod broker;
pub mod config;
pub mod csv_source;
pub mod decision;
pub mod execution;
pub mod market_data;
pub mod order_log;
pub mod paper;
pub mod state;

pub use alpaca::{build_client, AlpacaBroker, AlpacaMarketData, ClientError};
pub use broker::{BracketOrder, Broker, BrokerError, MarketOrder, OrderAck, PositionStatus};
pub use config::{BotConfig, ConfigError, Credentials};
pub use csv_source::{read_bars_csv, CsvMarketData};
pub use decision::{CycleError, CycleOutcome, DecisionLoop};
pub use execution::{flatten_if_opposite, submit_entry, Submission};
pub use market_data::{fetch_or_empty, DataError, MarketData};
pub use order_log::{OrderLog, OrderLogError, OrderLogRow};
pub use paper::{PaperBroker, PaperOrder};
pub use state::{StateError, StateStore};
