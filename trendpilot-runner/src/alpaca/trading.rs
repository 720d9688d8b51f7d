//! Alpaca trading API: account, positions, orders and the market clock.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trendpilot_core::domain::Direction;

use super::{join_url, path_symbol};
use crate::broker::{Broker, BracketOrder, BrokerError, MarketOrder, OrderAck, PositionStatus};

#[derive(Debug, Deserialize)]
struct Account {
    equity: Option<String>,
    cash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Position {
    qty: String,
}

#[derive(Debug, Deserialize)]
struct Clock {
    is_open: bool,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct TakeProfit {
    limit_price: f64,
}

#[derive(Debug, Serialize)]
struct StopLoss {
    stop_price: f64,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    symbol: &'a str,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    take_profit: Option<TakeProfit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_loss: Option<StopLoss>,
}

impl<'a> OrderRequest<'a> {
    fn market(symbol: &'a str, direction: Direction, qty: f64) -> Self {
        Self {
            symbol,
            qty: qty.to_string(),
            side: direction.order_side(),
            order_type: "market",
            time_in_force: "gtc",
            order_class: None,
            take_profit: None,
            stop_loss: None,
        }
    }

    fn bracket(order: &'a BracketOrder) -> Self {
        Self {
            order_class: Some("bracket"),
            take_profit: Some(TakeProfit {
                limit_price: order.take_profit,
            }),
            stop_loss: Some(StopLoss {
                stop_price: order.stop_loss,
            }),
            ..Self::market(&order.symbol, order.direction, order.qty)
        }
    }
}

/// Broker backed by the Alpaca trading API (paper or live by base URL).
pub struct AlpacaBroker {
    client: reqwest::Client,
    base_url: String,
}

impl AlpacaBroker {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&OrderRequest<'_>>,
    ) -> Result<reqwest::Response, BrokerError> {
        let url = join_url(&self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }
        Ok(req.send().await?)
    }

    async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, BrokerError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(BrokerError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn submit(&self, request: &OrderRequest<'_>) -> Result<OrderAck, BrokerError> {
        let resp = self.send(Method::POST, "v2/orders", Some(request)).await?;
        let order: OrderResponse = Self::expect_success(resp).await?.json().await?;
        debug!(id = %order.id, symbol = request.symbol, "order accepted");
        Ok(OrderAck { id: order.id })
    }
}

fn parse_number(field: &str, value: &str) -> Result<f64, BrokerError> {
    value
        .parse::<f64>()
        .map_err(|_| BrokerError::ResponseFormat(format!("{field} is not a number: {value:?}")))
}

fn position_from_qty(qty: f64) -> PositionStatus {
    if qty > 0.0 {
        PositionStatus::Open {
            direction: Direction::Long,
            qty,
        }
    } else if qty < 0.0 {
        PositionStatus::Open {
            direction: Direction::Short,
            qty: qty.abs(),
        }
    } else {
        PositionStatus::Flat
    }
}

#[async_trait]
impl Broker for AlpacaBroker {
    fn name(&self) -> &str {
        "alpaca"
    }

    async fn equity(&self) -> Result<f64, BrokerError> {
        let resp = self.send(Method::GET, "v2/account", None).await?;
        let account: Account = Self::expect_success(resp).await?.json().await?;
        match (account.equity.as_deref(), account.cash.as_deref()) {
            (Some(equity), _) if equity.parse::<f64>().is_ok() => parse_number("equity", equity),
            (_, Some(cash)) => parse_number("cash", cash),
            _ => Err(BrokerError::ResponseFormat("account has no equity or cash".into())),
        }
    }

    async fn position(&self, symbol: &str) -> Result<PositionStatus, BrokerError> {
        let path = format!("v2/positions/{}", path_symbol(symbol));
        let resp = self.send(Method::GET, &path, None).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(PositionStatus::Flat);
        }
        let position: Position = Self::expect_success(resp).await?.json().await?;
        Ok(position_from_qty(parse_number("qty", &position.qty)?))
    }

    async fn close_position(&self, symbol: &str) -> Result<(), BrokerError> {
        let path = format!("v2/positions/{}", path_symbol(symbol));
        let resp = self.send(Method::DELETE, &path, None).await?;
        Self::expect_success(resp).await?;
        Ok(())
    }

    async fn submit_bracket(&self, order: &BracketOrder) -> Result<OrderAck, BrokerError> {
        self.submit(&OrderRequest::bracket(order)).await
    }

    async fn submit_market(&self, order: &MarketOrder) -> Result<OrderAck, BrokerError> {
        self.submit(&OrderRequest::market(&order.symbol, order.direction, order.qty))
            .await
    }

    async fn clock(&self) -> Result<bool, BrokerError> {
        let resp = self.send(Method::GET, "v2/clock", None).await?;
        let clock: Clock = Self::expect_success(resp).await?.json().await?;
        Ok(clock.is_open)
    }
}
