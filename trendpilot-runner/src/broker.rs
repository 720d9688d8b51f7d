//! Brokerage collaborator.
//!
//! Query methods return explicit results: `Ok(PositionStatus::Flat)` is a
//! confirmed absence, `Err` is a failed query. Callers pick the fail-safe
//! default themselves.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use trendpilot_core::domain::Direction;

/// Structured error types for broker calls.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("broker rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected broker response: {0}")]
    ResponseFormat(String),

    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Open position for the traded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PositionStatus {
    Flat,
    Open { direction: Direction, qty: f64 },
}

impl PositionStatus {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            PositionStatus::Flat => None,
            PositionStatus::Open { direction, .. } => Some(*direction),
        }
    }
}

/// Entry with attached take-profit and stop-loss exits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketOrder {
    pub symbol: String,
    pub direction: Direction,
    pub qty: f64,
    /// Close the levels were computed from.
    pub reference_price: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
}

/// Plain directional market order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOrder {
    pub symbol: String,
    pub direction: Direction,
    pub qty: f64,
}

impl From<&BracketOrder> for MarketOrder {
    fn from(order: &BracketOrder) -> Self {
        Self {
            symbol: order.symbol.clone(),
            direction: order.direction,
            qty: order.qty,
        }
    }
}

/// Broker acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderAck {
    pub id: String,
}

#[async_trait]
pub trait Broker: Send + Sync {
    fn name(&self) -> &str;

    /// Account equity.
    async fn equity(&self) -> Result<f64, BrokerError>;

    async fn position(&self, symbol: &str) -> Result<PositionStatus, BrokerError>;

    async fn close_position(&self, symbol: &str) -> Result<(), BrokerError>;

    async fn submit_bracket(&self, order: &BracketOrder) -> Result<OrderAck, BrokerError>;

    async fn submit_market(&self, order: &MarketOrder) -> Result<OrderAck, BrokerError>;

    /// Whether the market for scheduled instruments is open right now.
    async fn clock(&self) -> Result<bool, BrokerError>;
}
