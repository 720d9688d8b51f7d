//! Flatten-then-enter execution against a [`Broker`].

use tracing::{info, warn};
use trendpilot_core::domain::Direction;

use crate::broker::{Broker, BracketOrder, BrokerError, MarketOrder, OrderAck, PositionStatus};

/// How an entry reached the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Bracket(OrderAck),
    /// The bracket was rejected and a plain market order went in instead.
    MarketFallback(OrderAck),
}

impl Submission {
    pub fn ack(&self) -> &OrderAck {
        match self {
            Submission::Bracket(ack) | Submission::MarketFallback(ack) => ack,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Submission::MarketFallback(_))
    }
}

/// Close an open position whose direction opposes `desired`.
///
/// A failed position query is treated as flat. Returns whether a close was
/// sent.
pub async fn flatten_if_opposite(
    broker: &dyn Broker,
    symbol: &str,
    desired: Direction,
) -> Result<bool, BrokerError> {
    let status = match broker.position(symbol).await {
        Ok(status) => status,
        Err(e) => {
            warn!(%symbol, error = %e, "position query failed; assuming flat");
            PositionStatus::Flat
        }
    };
    match status {
        PositionStatus::Open { direction, qty } if direction == desired.opposite() => {
            info!(%symbol, held = %direction, qty, "closing opposite position");
            broker.close_position(symbol).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Submit a bracket entry, degrading to a market order if it is rejected.
///
/// A rejection of the market order is returned to the caller.
pub async fn submit_entry(
    broker: &dyn Broker,
    order: &BracketOrder,
) -> Result<Submission, BrokerError> {
    match broker.submit_bracket(order).await {
        Ok(ack) => Ok(Submission::Bracket(ack)),
        Err(e) => {
            warn!(symbol = %order.symbol, error = %e, "bracket rejected; submitting plain market order");
            let ack = broker.submit_market(&MarketOrder::from(order)).await?;
            Ok(Submission::MarketFallback(ack))
        }
    }
}
