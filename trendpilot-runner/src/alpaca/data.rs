//! Alpaca historical bars.
//!
//! Crypto bars come from `v1beta3/crypto/us/bars`, stock bars from
//! `v2/stocks/{symbol}/bars`. Responses are paginated through
//! `next_page_token`. Rate limiting and server errors are retried with
//! exponential backoff.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use trendpilot_core::domain::{canonicalize_bars, AssetClass, Bar, Timeframe};

use super::{join_url, path_symbol};
use crate::market_data::{DataError, MarketData};

const PAGE_LIMIT: &str = "10000";

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: f64,
}

impl From<AlpacaBar> for Bar {
    fn from(b: AlpacaBar) -> Self {
        Bar {
            timestamp: b.t,
            open: b.o,
            high: b.h,
            low: b.l,
            close: b.c,
            volume: b.v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CryptoBarsPage {
    #[serde(default)]
    bars: HashMap<String, Vec<AlpacaBar>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StockBarsPage {
    bars: Option<Vec<AlpacaBar>>,
    next_page_token: Option<String>,
}

/// Historical bar client for one asset class.
pub struct AlpacaMarketData {
    client: reqwest::Client,
    base_url: String,
    asset_class: AssetClass,
    max_retries: u32,
    base_delay: Duration,
}

impl AlpacaMarketData {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            asset_class,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    fn bars_url(&self, symbol: &str) -> String {
        match self.asset_class {
            AssetClass::Crypto => join_url(&self.base_url, "v1beta3/crypto/us/bars"),
            AssetClass::Equity => {
                join_url(&self.base_url, &format!("v2/stocks/{}/bars", path_symbol(symbol)))
            }
        }
    }

    /// GET with retry on rate limiting, server errors and network failures.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            let resp = match self.client.get(url).query(query).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(attempt, error = %e, "bar request failed");
                    last_error = Some(DataError::Network(e));
                    continue;
                }
            };

            let status = resp.status();
            if status.as_u16() == 429 {
                warn!(attempt, "rate limited by data API");
                last_error = Some(DataError::RateLimited);
                continue;
            }
            if status.is_server_error() {
                let body = resp.text().await.unwrap_or_default();
                last_error = Some(DataError::Status {
                    status: status.as_u16(),
                    body,
                });
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(DataError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            return Ok(resp.json().await?);
        }

        Err(last_error.unwrap_or(DataError::RateLimited))
    }

    async fn fetch_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError> {
        let url = self.bars_url(symbol);
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeframe", timeframe.to_string()),
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if self.asset_class == AssetClass::Crypto {
                query.push(("symbols", symbol.to_string()));
            }
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let json = self.get_json(&url, &query).await?;
            let (page, next) = self.parse_page(symbol, json)?;
            bars.extend(page);

            match next {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(bars)
    }

    fn parse_page(
        &self,
        symbol: &str,
        json: serde_json::Value,
    ) -> Result<(Vec<Bar>, Option<String>), DataError> {
        let format_err = |e: serde_json::Error| DataError::ResponseFormat(e.to_string());
        match self.asset_class {
            AssetClass::Crypto => {
                let mut page: CryptoBarsPage = serde_json::from_value(json).map_err(format_err)?;
                let bars = page.bars.remove(symbol).unwrap_or_default();
                Ok((bars.into_iter().map(Bar::from).collect(), page.next_page_token))
            }
            AssetClass::Equity => {
                let page: StockBarsPage = serde_json::from_value(json).map_err(format_err)?;
                let bars = page.bars.unwrap_or_default();
                Ok((bars.into_iter().map(Bar::from).collect(), page.next_page_token))
            }
        }
    }
}

#[async_trait]
impl MarketData for AlpacaMarketData {
    fn name(&self) -> &str {
        "alpaca"
    }

    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let end = Utc::now();
        let start = end - ChronoDuration::days(timeframe.days_for_lookback(lookback));
        let bars = canonicalize_bars(self.fetch_range(symbol, timeframe, start, end).await?);
        debug!(%symbol, %timeframe, count = bars.len(), "fetched bars");

        let skip = bars.len().saturating_sub(lookback);
        Ok(bars.into_iter().skip(skip).collect())
    }
}
