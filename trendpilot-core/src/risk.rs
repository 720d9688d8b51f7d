//! Daily drawdown guard.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::params::RiskParams;

/// Equity recorded at the start of a UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayEquityAnchor {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Result of rolling the anchor forward to the current day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorUpdate {
    pub anchor: DayEquityAnchor,
    /// True when a new anchor was created and must be persisted.
    pub changed: bool,
}

/// Pauses trading once the intraday drawdown reaches the configured limit.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyLossGuard {
    params: RiskParams,
}

impl DailyLossGuard {
    pub fn new(params: RiskParams) -> Self {
        Self { params }
    }

    pub fn enabled(&self) -> bool {
        self.params.enable_daily_loss_guard
    }

    /// Keep `stored` if it belongs to the UTC day of `now`, otherwise anchor
    /// today at `equity`.
    pub fn roll_anchor(
        &self,
        now: DateTime<Utc>,
        equity: f64,
        stored: Option<DayEquityAnchor>,
    ) -> AnchorUpdate {
        let today = now.date_naive();
        match stored {
            Some(anchor) if anchor.date == today => AnchorUpdate {
                anchor,
                changed: false,
            },
            _ => AnchorUpdate {
                anchor: DayEquityAnchor {
                    date: today,
                    equity,
                },
                changed: true,
            },
        }
    }

    /// Fractional drawdown from the anchor, or `None` when the anchor equity
    /// is not positive.
    pub fn drawdown(anchor: &DayEquityAnchor, equity: f64) -> Option<f64> {
        if anchor.equity > 0.0 {
            Some((anchor.equity - equity) / anchor.equity)
        } else {
            None
        }
    }

    pub fn is_paused(&self, anchor: &DayEquityAnchor, equity: f64) -> bool {
        if !self.enabled() {
            return false;
        }
        match Self::drawdown(anchor, equity) {
            Some(dd) => dd >= self.params.max_daily_drawdown_pct,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn guard(enabled: bool) -> DailyLossGuard {
        DailyLossGuard::new(RiskParams {
            enable_daily_loss_guard: enabled,
            max_daily_drawdown_pct: 0.05,
        })
    }

    fn anchor(equity: f64) -> DayEquityAnchor {
        DayEquityAnchor {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            equity,
        }
    }

    #[test]
    fn pauses_at_threshold() {
        let g = guard(true);
        assert!(g.is_paused(&anchor(10_000.0), 9_400.0));
        assert!(!g.is_paused(&anchor(10_000.0), 9_600.0));
        assert!(g.is_paused(&anchor(10_000.0), 9_500.0));
    }

    #[test]
    fn disabled_never_pauses() {
        let g = guard(false);
        assert!(!g.is_paused(&anchor(10_000.0), 1.0));
    }

    #[test]
    fn non_positive_anchor_never_pauses() {
        let g = guard(true);
        assert!(!g.is_paused(&anchor(0.0), 9_000.0));
        assert!(!g.is_paused(&anchor(-5.0), -100.0));
    }

    #[test]
    fn anchor_kept_within_day() {
        let g = guard(true);
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 0).unwrap();
        let update = g.roll_anchor(now, 8_000.0, Some(anchor(10_000.0)));
        assert!(!update.changed);
        assert_eq!(update.anchor.equity, 10_000.0);
    }

    #[test]
    fn anchor_rolls_on_new_day() {
        let g = guard(true);
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 1).unwrap();
        let update = g.roll_anchor(now, 8_000.0, Some(anchor(10_000.0)));
        assert!(update.changed);
        assert_eq!(update.anchor.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(update.anchor.equity, 8_000.0);

        let fresh = g.roll_anchor(now, 7_000.0, None);
        assert!(fresh.changed);
        assert_eq!(fresh.anchor.equity, 7_000.0);
    }

    #[test]
    fn anchor_serializes_as_date_and_equity() {
        let json = serde_json::to_string(&anchor(10_000.0)).unwrap();
        assert_eq!(json, r#"{"date":"2024-03-01","equity":10000.0}"#);
    }
}
