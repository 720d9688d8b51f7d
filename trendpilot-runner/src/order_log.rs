//! Append-only CSV log of execution attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

const HEADER: [&str; 7] = ["ts_utc", "symbol", "side", "qty", "price", "atr", "order_id"];

#[derive(Debug, Error)]
pub enum OrderLogError {
    #[error("order log I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("order log CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLogRow {
    pub ts_utc: DateTime<Utc>,
    pub symbol: String,
    /// `LONG` or `SHORT`.
    pub side: String,
    pub qty: f64,
    pub price: f64,
    pub atr: f64,
    /// Empty when no order was accepted.
    pub order_id: String,
}

#[derive(Debug, Clone)]
pub struct OrderLog {
    path: PathBuf,
}

impl OrderLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `orders.csv` inside `log_dir`.
    pub fn in_dir(log_dir: impl AsRef<Path>) -> Self {
        Self::new(log_dir.as_ref().join("orders.csv"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a row, writing the header first if the file is new or empty.
    pub fn append(&self, row: &OrderLogRow) -> Result<(), OrderLogError> {
        let io_err = |source| OrderLogError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            wtr.write_record(HEADER)?;
        }
        wtr.serialize(row)?;
        wtr.flush().map_err(io_err)?;
        Ok(())
    }

    /// All rows in file order; a missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<OrderLogRow>, OrderLogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&self.path)?;
        let rows = rdr.deserialize().collect::<Result<Vec<OrderLogRow>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(order_id: &str) -> OrderLogRow {
        OrderLogRow {
            ts_utc: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            symbol: "BTC/USD".into(),
            side: "LONG".into(),
            qty: 0.75,
            price: 100.0,
            atr: 2.5,
            order_id: order_id.into(),
        }
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = OrderLog::in_dir(dir.path().join("logs"));
        log.append(&row("abc")).unwrap();
        log.append(&row("")).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ts_utc,symbol,side,qty,price,atr,order_id");
        assert!(lines[2].ends_with(','));
    }

    #[test]
    fn rows_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = OrderLog::in_dir(dir.path());
        assert!(log.read_all().unwrap().is_empty());
        log.append(&row("abc")).unwrap();
        log.append(&row("")).unwrap();
        let rows = log.read_all().unwrap();
        assert_eq!(rows, vec![row("abc"), row("")]);
    }
}
