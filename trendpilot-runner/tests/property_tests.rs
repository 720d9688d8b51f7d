//! Property tests for bar retrieval and persisted state.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use trendpilot_core::domain::{Bar, Timeframe};
use trendpilot_runner::market_data::{fetch_or_empty, DataError, MarketData};
use trendpilot_runner::state::{StateError, StateStore};

fn at(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
}

fn bar(hour: i64) -> Bar {
    Bar {
        timestamp: at(hour),
        open: 1.0,
        high: 2.0,
        low: 0.5,
        close: 1.5,
        volume: 1.0,
    }
}

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

proptest! {
    #[test]
    fn fetched_series_is_canonical_and_keeps_newest(
        hours in prop::collection::vec(0i64..500, 0..80),
        lookback in 1usize..100,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let source = Fixed(hours.iter().map(|&h| bar(h)).collect());
        let bars = rt.block_on(fetch_or_empty(&source, "BTC/USD", Timeframe::ONE_HOUR, lookback));

        prop_assert!(bars.len() <= lookback);
        for w in bars.windows(2) {
            prop_assert!(w[0].timestamp < w[1].timestamp);
        }
        match hours.iter().max() {
            Some(&newest) => prop_assert_eq!(bars.last().map(|b| b.timestamp), Some(at(newest))),
            None => prop_assert!(bars.is_empty()),
        }
    }

    #[test]
    fn marker_only_moves_forward(hours in prop::collection::vec(0i64..200, 1..30)) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let mut high: Option<i64> = None;

        for &h in &hours {
            let result = store.set_last_bar(at(h));
            match high {
                Some(prev) if h < prev => {
                    let regressed = matches!(result, Err(StateError::MarkerRegression { .. }));
                    prop_assert!(regressed);
                }
                _ => {
                    prop_assert!(result.is_ok());
                    high = Some(h);
                }
            }
            prop_assert_eq!(store.last_bar(), high.map(at));
        }
    }
}
