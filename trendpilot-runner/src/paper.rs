//! In-memory broker for dry runs and tests.
//!
//! Orders fill immediately and in full. Failure modes can be switched on to
//! exercise the fallback paths of the decision loop.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use trendpilot_core::domain::Direction;
use uuid::Uuid;

use crate::broker::{Broker, BracketOrder, BrokerError, MarketOrder, OrderAck, PositionStatus};

/// An order accepted by the paper broker.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub qty: f64,
    /// `(take_profit, stop_loss)` for bracket entries.
    pub bracket: Option<(f64, f64)>,
}

#[derive(Debug)]
struct PaperState {
    equity: f64,
    position: PositionStatus,
    market_open: bool,
    reject_brackets: bool,
    reject_market: bool,
    fail_queries: bool,
    orders: Vec<PaperOrder>,
    closes: usize,
}

#[derive(Debug)]
pub struct PaperBroker {
    state: Mutex<PaperState>,
}

impl PaperBroker {
    pub fn new(equity: f64) -> Self {
        Self {
            state: Mutex::new(PaperState {
                equity,
                position: PositionStatus::Flat,
                market_open: true,
                reject_brackets: false,
                reject_market: false,
                fail_queries: false,
                orders: Vec::new(),
                closes: 0,
            }),
        }
    }

    pub fn with_position(self, direction: Direction, qty: f64) -> Self {
        self.lock().position = PositionStatus::Open { direction, qty };
        self
    }

    pub fn with_market_open(self, open: bool) -> Self {
        self.lock().market_open = open;
        self
    }

    pub fn rejecting_brackets(self) -> Self {
        self.lock().reject_brackets = true;
        self
    }

    pub fn rejecting_market(self) -> Self {
        self.lock().reject_market = true;
        self
    }

    /// Position and clock queries fail.
    pub fn failing_queries(self) -> Self {
        self.lock().fail_queries = true;
        self
    }

    pub fn set_equity(&self, equity: f64) {
        self.lock().equity = equity;
    }

    pub fn orders(&self) -> Vec<PaperOrder> {
        self.lock().orders.clone()
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fill(&self, symbol: &str, direction: Direction, qty: f64, bracket: Option<(f64, f64)>) -> OrderAck {
        let mut state = self.lock();
        let id = Uuid::new_v4().to_string();
        state.position = match state.position {
            PositionStatus::Open { direction: held, qty: held_qty } if held == direction => {
                PositionStatus::Open {
                    direction,
                    qty: held_qty + qty,
                }
            }
            _ => PositionStatus::Open { direction, qty },
        };
        state.orders.push(PaperOrder {
            id: id.clone(),
            symbol: symbol.to_string(),
            direction,
            qty,
            bracket,
        });
        OrderAck { id }
    }
}

#[async_trait]
impl Broker for PaperBroker {
    fn name(&self) -> &str {
        "paper"
    }

    async fn equity(&self) -> Result<f64, BrokerError> {
        Ok(self.lock().equity)
    }

    async fn position(&self, _symbol: &str) -> Result<PositionStatus, BrokerError> {
        let state = self.lock();
        if state.fail_queries {
            return Err(BrokerError::Unavailable("position query disabled".into()));
        }
        Ok(state.position)
    }

    async fn close_position(&self, _symbol: &str) -> Result<(), BrokerError> {
        let mut state = self.lock();
        state.position = PositionStatus::Flat;
        state.closes += 1;
        Ok(())
    }

    async fn submit_bracket(&self, order: &BracketOrder) -> Result<OrderAck, BrokerError> {
        if self.lock().reject_brackets {
            return Err(BrokerError::Rejected {
                status: 422,
                message: "bracket orders disabled".into(),
            });
        }
        Ok(self.fill(
            &order.symbol,
            order.direction,
            order.qty,
            Some((order.take_profit, order.stop_loss)),
        ))
    }

    async fn submit_market(&self, order: &MarketOrder) -> Result<OrderAck, BrokerError> {
        if self.lock().reject_market {
            return Err(BrokerError::Rejected {
                status: 422,
                message: "market orders disabled".into(),
            });
        }
        Ok(self.fill(&order.symbol, order.direction, order.qty, None))
    }

    async fn clock(&self) -> Result<bool, BrokerError> {
        let state = self.lock();
        if state.fail_queries {
            return Err(BrokerError::Unavailable("clock query disabled".into()));
        }
        Ok(state.market_open)
    }
}
