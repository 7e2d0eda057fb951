use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use common::{Bar, Deal, Decision, DecisionReason, Direction, Error, Venue};

/// User-configurable risk parameters for the position manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderConfig {
    /// Fraction of the balance committed to a new position (e.g. 0.1 = 10%).
    pub risk_fraction: f64,
    /// Adverse move fraction placing the default stop (e.g. 0.02 = 2%).
    pub max_loss_fraction: f64,
    /// P&L-to-balance fraction at which profit is taken (e.g. 0.04 = 4%).
    pub min_profit_fraction: f64,
    /// Interval between venue polls while waiting for order settlement.
    pub settle_poll_ms: u64,
    /// Total time to wait for the venue to confirm a submitted deal.
    pub settle_timeout_ms: u64,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            risk_fraction: 0.1,
            max_loss_fraction: 0.02,
            min_profit_fraction: 0.04,
            settle_poll_ms: 50,
            settle_timeout_ms: 1_000,
        }
    }
}

impl TraderConfig {
    /// Risk defaults with the settle timing taken from the environment
    /// configuration.
    pub fn with_settle_from(cfg: &common::Config) -> Self {
        Self {
            settle_poll_ms: cfg.settle_poll_ms,
            settle_timeout_ms: cfg.settle_timeout_ms,
            ..Self::default()
        }
    }
}

/// Outcome of waiting for the venue to confirm a submitted deal.
#[derive(Debug)]
pub enum Settlement {
    /// The venue reports the deal as open; carries its authoritative view.
    Confirmed(Deal),
    /// The venue never reported the deal within the settle timeout.
    TimedOut,
    /// A poll failed outright.
    Failed(Error),
}

/// Closed-deal summary over one trading session.
#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    pub wins: usize,
    pub losses: usize,
    pub win_rate_pct: f64,
    pub final_balance: f64,
    pub sum_profit: f64,
    pub sum_loss: f64,
}

/// The position manager: owns at most one open deal for its ticker and
/// every transition between flat and open states.
///
/// Venue-call failures are logged and never retried. A submit failure
/// leaves the trader flat; a failed or timed-out settlement poll keeps the
/// local deal unconfirmed; close and stop-update failures never block the
/// local transition (the divergence is resolved by the venue query on the
/// next `connect`).
pub struct Trader {
    ticker: String,
    config: TraderConfig,
    venue: Arc<dyn Venue>,
    balance: f64,
    sum_profit: f64,
    sum_loss: f64,
    current: Option<Deal>,
    closed: Vec<Deal>,
}

impl Trader {
    /// Build a trader resuming whatever state the venue reports: the
    /// current balance and any deal still open for `ticker` from a
    /// previous run.
    pub async fn connect(
        ticker: impl Into<String>,
        config: TraderConfig,
        venue: Arc<dyn Venue>,
    ) -> common::Result<Self> {
        let ticker = ticker.into();
        let balance = venue.balance().await?;
        let current = venue.current_deal(&ticker).await?;
        if let Some(deal) = &current {
            info!(
                ticker = %ticker,
                direction = %deal.direction,
                entry = deal.entry_price(),
                notional = deal.open_notional,
                stop = deal.stop_loss,
                "Existing deal loaded from venue"
            );
        }
        Ok(Self {
            ticker,
            config,
            venue,
            balance,
            sum_profit: 0.0,
            sum_loss: 0.0,
            current,
            closed: Vec::new(),
        })
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn current_deal(&self) -> Option<&Deal> {
        self.current.as_ref()
    }

    pub fn closed_deals(&self) -> &[Deal] {
        &self.closed
    }

    /// Feed one (decision, latest bar) pair through the state machine.
    pub async fn on_decision(&mut self, reason: &DecisionReason, bar: &Bar) {
        let Some(deal) = self.current.as_ref() else {
            if matches!(reason.decision, Decision::Long | Decision::Short) {
                self.open_position(reason, bar).await;
            }
            return;
        };

        let price = bar.close;
        let direction = deal.direction;
        let stop_loss = deal.stop_loss;
        let entry = deal.entry_price();
        let pnl = profit_loss(deal, price);
        let pnl_fraction = pnl / self.balance;

        let stop_hit = match direction {
            Direction::Long => price <= stop_loss,
            Direction::Short => price >= stop_loss,
        };
        let take_profit_hit = pnl_fraction >= self.config.min_profit_fraction
            || reason.take_profit.is_some_and(|tp| match direction {
                Direction::Long => price >= tp,
                Direction::Short => price <= tp,
            });
        let opposite_signal = matches!(
            (direction, reason.decision),
            (Direction::Long, Decision::Short) | (Direction::Short, Decision::Long)
        );

        if stop_hit {
            self.close_position(bar, "Stop loss triggered".to_string()).await;
        } else if take_profit_hit {
            self.close_position(bar, "Take-profit reached".to_string()).await;
        } else if reason.decision == Decision::Close {
            self.close_position(bar, format!("Close decision received: {}", reason.reason))
                .await;
        } else if opposite_signal {
            self.close_position(bar, format!("Opposite signal: {}", reason.reason))
                .await;
        } else {
            self.ratchet_stop(price).await;
            debug!(
                ticker = %self.ticker,
                direction = %direction,
                entry = entry,
                price = price,
                pnl = pnl,
                pnl_pct = pnl_fraction * 100.0,
                "Holding"
            );
        }
    }

    /// Closed-deal statistics for the session so far.
    pub fn performance(&self) -> Performance {
        let wins = self.closed.iter().filter(|deal| deal.is_win()).count();
        let losses = self.closed.len() - wins;
        let win_rate_pct = if self.closed.is_empty() {
            0.0
        } else {
            wins as f64 / self.closed.len() as f64 * 100.0
        };
        Performance {
            wins,
            losses,
            win_rate_pct,
            final_balance: self.balance,
            sum_profit: self.sum_profit,
            sum_loss: self.sum_loss,
        }
    }

    async fn open_position(&mut self, reason: &DecisionReason, bar: &Bar) {
        let direction = if reason.decision == Decision::Long {
            Direction::Long
        } else {
            Direction::Short
        };
        let notional = self.balance * self.config.risk_fraction;
        let stop = self.initial_stop(reason, bar.close, direction);
        let deal = Deal::open(&self.ticker, direction, bar.clone(), notional, stop);

        if let Err(e) = self.venue.submit_deal(&deal).await {
            error!(ticker = %self.ticker, error = %e, "Deal submit failed — staying flat");
            return;
        }
        info!(
            ticker = %self.ticker,
            direction = %direction,
            price = bar.close,
            notional = notional,
            stop = stop,
            reason = %reason.reason,
            time = %bar.close_time_utc(),
            "New deal opened"
        );
        self.current = Some(deal);

        // Two-phase open: the venue's view of the deal is authoritative, so
        // re-read it before arming the protective stop.
        match self.settle().await {
            Settlement::Confirmed(mut venue_deal) => {
                let stop = self.initial_stop(reason, bar.close, venue_deal.direction);
                venue_deal.stop_loss = stop;
                if let Err(e) = self.venue.update_stop_loss(&venue_deal, stop).await {
                    error!(ticker = %self.ticker, error = %e, "Stop-loss push failed after open");
                }
                self.current = Some(venue_deal);
            }
            Settlement::TimedOut => {
                warn!(ticker = %self.ticker, "Venue did not confirm the deal in time — holding it unconfirmed");
            }
            Settlement::Failed(e) => {
                warn!(ticker = %self.ticker, error = %e, "Settlement poll failed — holding the deal unconfirmed");
            }
        }
    }

    /// Poll the venue until it reports an open deal for our ticker, up to
    /// the configured settle timeout.
    async fn settle(&self) -> Settlement {
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.settle_timeout_ms);
        loop {
            match self.venue.current_deal(&self.ticker).await {
                Ok(Some(deal)) => return Settlement::Confirmed(deal),
                Ok(None) => {}
                Err(e) => return Settlement::Failed(e),
            }
            if tokio::time::Instant::now() >= deadline {
                return Settlement::TimedOut;
            }
            tokio::time::sleep(Duration::from_millis(self.config.settle_poll_ms)).await;
        }
    }

    fn initial_stop(&self, reason: &DecisionReason, price: f64, direction: Direction) -> f64 {
        if let Some(stop) = reason.dynamic_stop_loss {
            let on_protective_side = match direction {
                Direction::Long => stop < price,
                Direction::Short => stop > price,
            };
            if on_protective_side {
                return stop;
            }
            warn!(
                ticker = %self.ticker,
                stop = stop,
                price = price,
                "Dynamic stop on the wrong side of entry — using default"
            );
        }
        match direction {
            Direction::Long => price * (1.0 - self.config.max_loss_fraction),
            Direction::Short => price * (1.0 + self.config.max_loss_fraction),
        }
    }

    /// While the position is favorable, trail the stop at half the maximum
    /// loss distance, tightening only.
    async fn ratchet_stop(&mut self, price: f64) {
        let trail = self.config.max_loss_fraction / 2.0;
        let Some(deal) = self.current.as_mut() else {
            return;
        };
        if profit_loss(deal, price) <= 0.0 {
            return;
        }
        match deal.direction {
            Direction::Long => deal.stop_loss = deal.stop_loss.max(price * (1.0 - trail)),
            Direction::Short => deal.stop_loss = deal.stop_loss.min(price * (1.0 + trail)),
        }
        let pushed = deal.clone();
        if let Err(e) = self.venue.update_stop_loss(&pushed, pushed.stop_loss).await {
            error!(ticker = %self.ticker, error = %e, "Stop-loss update failed");
            return;
        }
        debug!(ticker = %self.ticker, stop = pushed.stop_loss, "Stop loss tightened");
    }

    async fn close_position(&mut self, bar: &Bar, reason: String) {
        let Some(mut deal) = self.current.take() else {
            return;
        };
        let price = bar.close;
        let pnl = profit_loss(&deal, price);
        deal.closed_notional = deal.open_notional + pnl;
        deal.closed_bar = Some(bar.clone());

        if let Err(e) = self.venue.close_deal(&deal, price).await {
            error!(ticker = %self.ticker, error = %e, "Venue close failed — finalizing locally anyway");
        }

        let old_balance = self.balance;
        match self.venue.balance().await {
            Ok(balance) => self.balance = balance,
            Err(e) => {
                warn!(ticker = %self.ticker, error = %e, "Balance refresh failed — applying realized P&L locally");
                self.balance = old_balance + pnl;
            }
        }
        let approx_pnl = self.balance - old_balance;
        if approx_pnl > 0.0 {
            self.sum_profit += approx_pnl;
        } else {
            self.sum_loss += approx_pnl;
        }

        let duration_min = (bar.close_time - deal.opened_bar.close_time) / 1000 / 60;
        let message = format!(
            "Deal closed. Reason: {reason}. ApproxPL: {approx_pnl:.2}. OldBalance: {old_balance:.2} -> NewBalance: {:.2}. Duration: {duration_min} min. {}",
            self.balance,
            bar.close_time_utc().format("%Y-%m-%d %H:%M:%S"),
        );
        info!(ticker = %self.ticker, "{message}");
        deal.close_message = Some(message);
        self.closed.push(deal);
    }
}

fn profit_loss(deal: &Deal, price: f64) -> f64 {
    let entry = deal.entry_price();
    match deal.direction {
        Direction::Long => deal.open_notional * (price - entry) / entry,
        Direction::Short => deal.open_notional * (entry - price) / entry,
    }
}
