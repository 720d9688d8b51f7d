//! Persisted bot state.
//!
//! Two point-in-time records live in the state directory:
//! - `last_bar.txt`: RFC 3339 timestamp of the last bar acted on
//! - `day_start_equity.json`: `{date, equity}` anchor for the drawdown guard
//!
//! Writes go to a temp file that is renamed over the target, so a crash never
//! leaves a half-written record. Unreadable or corrupt records are reported
//! and treated as absent.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use trendpilot_core::risk::DayEquityAnchor;

const LAST_BAR_FILE: &str = "last_bar.txt";
const DAY_ANCHOR_FILE: &str = "day_start_equity.json";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("marker would move backwards: {current} -> {proposed}")]
    MarkerRegression {
        current: DateTime<Utc>,
        proposed: DateTime<Utc>,
    },
}

/// File-backed store for the bar marker and the day equity anchor.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Open the store, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StateError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(io_at(&dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Timestamp of the last processed bar, if a valid one is stored.
    pub fn last_bar(&self) -> Option<DateTime<Utc>> {
        let path = self.dir.join(LAST_BAR_FILE);
        let text = read_optional(&path)?;
        match DateTime::parse_from_rfc3339(text.trim()) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt bar marker; ignoring");
                None
            }
        }
    }

    /// Persist the marker. It may only move forward.
    pub fn set_last_bar(&self, ts: DateTime<Utc>) -> Result<(), StateError> {
        if let Some(current) = self.last_bar() {
            if ts < current {
                return Err(StateError::MarkerRegression {
                    current,
                    proposed: ts,
                });
            }
        }
        self.write_atomic(LAST_BAR_FILE, ts.to_rfc3339().as_bytes())
    }

    /// The stored day anchor, if a valid one exists.
    pub fn day_anchor(&self) -> Option<DayEquityAnchor> {
        let path = self.dir.join(DAY_ANCHOR_FILE);
        let text = read_optional(&path)?;
        match serde_json::from_str(&text) {
            Ok(anchor) => Some(anchor),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt day anchor; ignoring");
                None
            }
        }
    }

    pub fn set_day_anchor(&self, anchor: &DayEquityAnchor) -> Result<(), StateError> {
        let json = serde_json::to_vec(anchor)?;
        self.write_atomic(DAY_ANCHOR_FILE, &json)
    }

    fn write_atomic(&self, name: &str, contents: &[u8]) -> Result<(), StateError> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        let mut file = fs::File::create(&tmp).map_err(io_at(&tmp))?;
        file.write_all(contents).map_err(io_at(&tmp))?;
        file.sync_all().map_err(io_at(&tmp))?;
        drop(file);
        fs::rename(&tmp, &target).map_err(io_at(&target))?;
        Ok(())
    }
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> StateError {
    let path = path.to_path_buf();
    move |source| StateError::Io { path, source }
}

/// File contents, or `None` if missing or unreadable.
fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable state file; ignoring");
            None
        }
    }
}
