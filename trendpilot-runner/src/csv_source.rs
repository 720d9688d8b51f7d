//! Offline bar source backed by one CSV file per timeframe.
//!
//! Expected columns: `timestamp,open,high,low,close,volume`, timestamps in
//! RFC 3339.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use trendpilot_core::domain::{canonicalize_bars, Bar, Timeframe};

use crate::market_data::{DataError, MarketData};

#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

impl From<CsvBar> for Bar {
    fn from(row: CsvBar) -> Self {
        Bar {
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

/// Read every bar in a CSV file, canonicalized.
pub fn read_bars_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();
    for row in rdr.deserialize::<CsvBar>() {
        bars.push(Bar::from(row?));
    }
    Ok(canonicalize_bars(bars))
}

#[derive(Debug, Clone, Default)]
pub struct CsvMarketData {
    files: HashMap<Timeframe, PathBuf>,
}

impl CsvMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source with the usual 1h and 4h files.
    pub fn hourly(bars_1h: impl Into<PathBuf>, bars_4h: impl Into<PathBuf>) -> Self {
        Self::new()
            .with_file(Timeframe::ONE_HOUR, bars_1h)
            .with_file(Timeframe::FOUR_HOURS, bars_4h)
    }

    pub fn with_file(mut self, timeframe: Timeframe, path: impl Into<PathBuf>) -> Self {
        self.files.insert(timeframe, path.into());
        self
    }
}

#[async_trait]
impl MarketData for CsvMarketData {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch(
        &self,
        _symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self
            .files
            .get(&timeframe)
            .ok_or(DataError::UnsupportedTimeframe(timeframe))?;
        let mut bars = read_bars_csv(path)?;
        if bars.len() > lookback {
            bars.drain(..bars.len() - lookback);
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAMPLE: &str = "timestamp,open,high,low,close,volume
2024-01-01T02:00:00Z,3,4,2,3.5,10
2024-01-01T00:00:00Z,1,2,0.5,1.5,10
2024-01-01T01:00:00Z,2,3,1,2.5,10
2024-01-01T01:00:00Z,9,9,9,9,9
";

    #[tokio::test]
    async fn reads_sorted_deduped_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc_1h.csv");
        fs::write(&path, SAMPLE).unwrap();

        let source = CsvMarketData::new().with_file(Timeframe::ONE_HOUR, &path);
        let bars = source.fetch("BTC/USD", Timeframe::ONE_HOUR, 2).await.unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.5, 3.5]);
    }

    #[tokio::test]
    async fn unknown_timeframe_errors() {
        let source = CsvMarketData::new();
        let err = source.fetch("BTC/USD", Timeframe::FOUR_HOURS, 10).await.unwrap_err();
        assert!(matches!(err, DataError::UnsupportedTimeframe(_)));
    }

    #[tokio::test]
    async fn malformed_row_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "timestamp,open,high,low,close,volume\nyesterday,1,2,3,4,5\n").unwrap();
        let source = CsvMarketData::new().with_file(Timeframe::ONE_HOUR, &path);
        assert!(matches!(
            source.fetch("X", Timeframe::ONE_HOUR, 10).await,
            Err(DataError::Csv(_))
        ));
    }
}
