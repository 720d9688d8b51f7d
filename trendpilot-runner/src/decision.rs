//! The per-bar decision loop.
//!
//! One cycle per poll tick, strictly sequential:
//!
//! 1. Read equity and record today's anchor if the UTC day is new.
//! 2. Fetch 1h and 4h bars; either empty → nothing to do.
//! 3. Compute indicators, fuse, derive signals.
//! 4. Compare the newest bar with the persisted marker; not newer → done.
//! 5. Persist the marker before any order action.
//! 6. Gates: market hours, daily drawdown guard, volatility spike, entry.
//! 7. Size, flatten an opposite position, submit the entry.
//! 8. Record the attempt in the order log.
//!
//! Persisting the marker first means a crash can at worst skip one entry; it
//! can never act twice on the same bar.

use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use trendpilot_core::domain::{Direction, Instrument, Timeframe};
use trendpilot_core::risk::{DailyLossGuard, DayEquityAnchor};
use trendpilot_core::signal::{compute_signals, SignalRow};
use trendpilot_core::sizing::{size_entry, volatility_spike, SizingDecision};

use crate::broker::{BracketOrder, Broker, BrokerError};
use crate::config::BotConfig;
use crate::execution::{flatten_if_opposite, submit_entry};
use crate::market_data::{fetch_or_empty, MarketData};
use crate::order_log::{OrderLog, OrderLogError, OrderLogRow};
use crate::state::{StateError, StateStore};

/// Failures that abort a cycle. The loop logs them and carries on.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("broker: {0}")]
    Broker(#[from] BrokerError),

    #[error("state: {0}")]
    State(#[from] StateError),

    #[error("order log: {0}")]
    OrderLog(#[from] OrderLogError),
}

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// At least one bar series came back empty.
    NoData,
    /// The newest bar is not newer than the marker.
    AlreadyProcessed { bar: DateTime<Utc> },
    MarketClosed { bar: DateTime<Utc> },
    RiskPaused { bar: DateTime<Utc>, drawdown: f64 },
    VolatilitySpike { bar: DateTime<Utc>, ratio: f64 },
    NoSignal { bar: DateTime<Utc>, reason: String },
    ZeroQuantity { bar: DateTime<Utc>, direction: Direction },
    Submitted {
        bar: DateTime<Utc>,
        decision: SizingDecision,
        order_id: String,
        fallback: bool,
        flattened: bool,
    },
}

pub struct DecisionLoop {
    config: BotConfig,
    instrument: Instrument,
    data: Arc<dyn MarketData>,
    broker: Arc<dyn Broker>,
    state: StateStore,
    order_log: OrderLog,
    guard: DailyLossGuard,
    /// Day on which the guard tripped; trading stays paused until it changes.
    paused_on: Option<NaiveDate>,
}

impl DecisionLoop {
    pub fn new(
        config: BotConfig,
        data: Arc<dyn MarketData>,
        broker: Arc<dyn Broker>,
        state: StateStore,
        order_log: OrderLog,
    ) -> Self {
        let instrument = config.instrument();
        let guard = DailyLossGuard::new(config.risk.clone());
        Self {
            config,
            instrument,
            data,
            broker,
            state,
            order_log,
            guard,
            paused_on: None,
        }
    }

    /// Run one full cycle as of `now`.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome, CycleError> {
        let symbol = self.instrument.symbol.clone();

        // Anchored on every cycle so the day's first reading is taken even when
        // no new bar arrives or the market is closed.
        let (anchor, equity) = self.refresh_anchor(now).await?;

        let bars_1h = fetch_or_empty(
            self.data.as_ref(),
            &symbol,
            Timeframe::ONE_HOUR,
            self.config.data.lookback_1h,
        )
        .await;
        let bars_4h = fetch_or_empty(
            self.data.as_ref(),
            &symbol,
            Timeframe::FOUR_HOURS,
            self.config.data.lookback_4h,
        )
        .await;
        if bars_1h.is_empty() || bars_4h.is_empty() {
            debug!(%symbol, n_1h = bars_1h.len(), n_4h = bars_4h.len(), "no bars; skipping cycle");
            return Ok(CycleOutcome::NoData);
        }

        let rows = compute_signals(&bars_1h, &bars_4h, &self.config.strategy);
        let Some(row) = rows.last() else {
            return Ok(CycleOutcome::NoData);
        };
        let bar = row.timestamp;

        if let Some(marker) = self.state.last_bar() {
            if bar <= marker {
                debug!(%bar, %marker, "bar already processed");
                return Ok(CycleOutcome::AlreadyProcessed { bar });
            }
        }
        self.state.set_last_bar(bar)?;

        if !self.instrument.always_open {
            match self.broker.clock().await {
                Ok(true) => {}
                Ok(false) => {
                    info!(%bar, "market closed");
                    return Ok(CycleOutcome::MarketClosed { bar });
                }
                Err(e) => warn!(error = %e, "clock query failed; assuming market open"),
            }
        }

        let today = anchor.date;
        if self.paused_on.is_some_and(|d| d != today) {
            self.paused_on = None;
        }
        if self.paused_on.is_some() || self.guard.is_paused(&anchor, equity) {
            self.paused_on = Some(today);
            let drawdown = DailyLossGuard::drawdown(&anchor, equity).unwrap_or(0.0);
            warn!(%bar, drawdown, "daily loss guard triggered; skipping entries");
            return Ok(CycleOutcome::RiskPaused { bar, drawdown });
        }

        if volatility_spike(row.atr, row.close, self.config.sizing.vol_spike_cap) {
            let ratio = row.atr / row.close;
            info!(
                %bar,
                ratio = format!("{:.4}%", ratio * 100.0),
                cap = format!("{:.2}%", self.config.sizing.vol_spike_cap * 100.0),
                "skip entry: ATR spike"
            );
            return Ok(CycleOutcome::VolatilitySpike { bar, ratio });
        }

        let Some(direction) = row.entry else {
            let reason = self.log_no_entry(row);
            return Ok(CycleOutcome::NoSignal { bar, reason });
        };

        let Some(decision) = size_entry(
            direction,
            equity,
            row.atr,
            row.close,
            row.cmo_prev,
            self.config.strategy.cmo_threshold,
            &self.config.sizing,
            &self.instrument,
        ) else {
            info!(%bar, atr = row.atr, equity, "no entry: quantity is zero");
            return Ok(CycleOutcome::ZeroQuantity { bar, direction });
        };

        let flattened = flatten_if_opposite(self.broker.as_ref(), &symbol, direction).await?;

        let order = BracketOrder {
            symbol: symbol.clone(),
            direction,
            qty: decision.quantity,
            reference_price: row.close,
            take_profit: decision.take_profit,
            stop_loss: decision.stop_loss,
        };
        let submitted = submit_entry(self.broker.as_ref(), &order).await;

        let order_id = match &submitted {
            Ok(sub) => sub.ack().id.clone(),
            Err(_) => String::new(),
        };
        self.order_log.append(&OrderLogRow {
            ts_utc: now,
            symbol: symbol.clone(),
            side: direction.label().to_string(),
            qty: decision.quantity,
            price: row.close,
            atr: row.atr,
            order_id: order_id.clone(),
        })?;

        let submission = submitted?;
        info!(
            %bar,
            side = direction.label(),
            qty = decision.quantity,
            close = format!("{:.2}", row.close),
            atr = format!("{:.2}", row.atr),
            order_id = %order_id,
            fallback = submission.is_fallback(),
            "entry submitted"
        );

        Ok(CycleOutcome::Submitted {
            bar,
            decision,
            order_id,
            fallback: submission.is_fallback(),
            flattened,
        })
    }

    /// Current equity and today's anchor, persisting the anchor when the UTC
    /// day has rolled.
    async fn refresh_anchor(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(DayEquityAnchor, f64), CycleError> {
        let equity = self.broker.equity().await?;
        let update = self.guard.roll_anchor(now, equity, self.state.day_anchor());
        if update.changed {
            self.state.set_day_anchor(&update.anchor)?;
            info!(date = %update.anchor.date, equity, "new day equity anchor");
        }
        Ok((update.anchor, equity))
    }

    fn log_no_entry(&self, row: &SignalRow) -> String {
        let reason = row.diagnostics(&self.config.strategy).reason();
        let bar = row.timestamp;
        let atr = format!("{:.2}", row.atr);
        if self.config.debug_signals {
            info!(
                %bar,
                short_trend_prev = ?row.short_trend_prev,
                long_trend_prev = ?row.long_trend_prev,
                adx_prev = row.adx_prev,
                adx_slope_prev = row.adx_slope_prev,
                cmo_prev = row.cmo_prev,
                adx_threshold = self.config.strategy.adx_threshold,
                cmo_threshold = self.config.strategy.cmo_threshold,
                %reason,
                %atr,
                "no entry"
            );
        } else {
            debug!(%bar, %reason, %atr, "no entry");
        }
        reason
    }

    /// Run cycles until `shutdown` completes.
    ///
    /// Shutdown is only observed during the inter-cycle sleep, never mid-cycle.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let poll = Duration::from_secs(self.config.data.poll_seconds);
        info!(symbol = %self.instrument.symbol, poll_seconds = poll.as_secs(), "decision loop started");

        loop {
            match self.run_cycle(Utc::now()).await {
                Ok(outcome) => debug!(?outcome, "cycle finished"),
                Err(e) => error!(error = %e, "cycle failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(poll) => {}
                _ = &mut shutdown => {
                    info!("shutdown requested; exiting");
                    break;
                }
            }
        }
    }

    /// Run forever until Ctrl-C.
    pub async fn run(&mut self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }
}
