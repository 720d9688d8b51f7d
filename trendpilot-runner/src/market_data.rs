//! Market data collaborator.
//!
//! The [`MarketData`] trait abstracts over bar sources (Alpaca REST, CSV
//! files) so the decision loop can be driven offline and in tests.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use trendpilot_core::domain::{canonicalize_bars, Bar, Timeframe};

/// Structured error types for bar retrieval.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("no bar source configured for {0}")]
    UnsupportedTimeframe(Timeframe),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Source of closed OHLCV bars.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// At most the `lookback` most recent closed bars, ascending and
    /// deduplicated.
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>, DataError>;
}

/// Fetch bars, mapping a failure to an empty series.
///
/// The result is canonicalized regardless of what the source returned, and
/// bars failing the OHLC sanity check are dropped.
pub async fn fetch_or_empty(
    source: &dyn MarketData,
    symbol: &str,
    timeframe: Timeframe,
    lookback: usize,
) -> Vec<Bar> {
    match source.fetch(symbol, timeframe, lookback).await {
        Ok(bars) => {
            let fetched = bars.len();
            let sane: Vec<Bar> = bars.into_iter().filter(Bar::is_sane).collect();
            if sane.len() < fetched {
                warn!(
                    source = source.name(),
                    %symbol,
                    %timeframe,
                    dropped = fetched - sane.len(),
                    "dropping malformed bars"
                );
            }
            let mut bars = canonicalize_bars(sane);
            if bars.len() > lookback {
                bars.drain(..bars.len() - lookback);
            }
            bars
        }
        Err(e) => {
            warn!(source = source.name(), %symbol, %timeframe, error = %e, "bar fetch failed; treating as empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixed(Vec<Bar>);

    #[async_trait]
    impl MarketData for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _: &str, _: Timeframe, _: usize) -> Result<Vec<Bar>, DataError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl MarketData for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _: &str, _: Timeframe, _: usize) -> Result<Vec<Bar>, DataError> {
            Err(DataError::RateLimited)
        }
    }

    fn bar(hour: i64) -> Bar {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
        Bar {
            timestamp: t,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
        }
    }

    #[tokio::test]
    async fn failure_maps_to_empty() {
        let bars = fetch_or_empty(&Failing, "BTC/USD", Timeframe::ONE_HOUR, 10).await;
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn malformed_bars_are_dropped() {
        let mut inverted = bar(2);
        inverted.high = 0.1;
        let mut zero_close = bar(3);
        zero_close.close = 0.0;
        let source = Fixed(vec![bar(0), bar(1), inverted, zero_close]);

        let bars = fetch_or_empty(&source, "BTC/USD", Timeframe::ONE_HOUR, 10).await;
        let hours: Vec<_> = bars.iter().map(|b| b.timestamp).collect();
        assert_eq!(hours, vec![bar(0).timestamp, bar(1).timestamp]);
    }

    #[tokio::test]
    async fn output_is_sorted_deduped_and_trimmed() {
        let source = Fixed(vec![bar(3), bar(1), bar(2), bar(2), bar(0)]);
        let bars = fetch_or_empty(&source, "BTC/USD", Timeframe::ONE_HOUR, 3).await;
        let hours: Vec<_> = bars.iter().map(|b| b.timestamp).collect();
        assert_eq!(hours, vec![bar(1).timestamp, bar(2).timestamp, bar(3).timestamp]);
    }
}
