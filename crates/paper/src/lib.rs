use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Deal, Direction, Error, Result, Venue};

/// Simulated venue for backtests and tests.
///
/// Keeps at most one open deal per ticker, applies configurable slippage in
/// basis points against the close fill, and realizes P&L into its balance
/// when a deal closes; the trader only ever reads the balance back.
pub struct PaperVenue {
    balance: RwLock<f64>,
    deals: RwLock<HashMap<String, Deal>>,
    slippage_bps: f64,
}

impl PaperVenue {
    pub fn new(initial_balance: f64, slippage_bps: f64) -> Self {
        info!(
            balance = initial_balance,
            slippage_bps = slippage_bps,
            "PaperVenue initialized"
        );
        Self {
            balance: RwLock::new(initial_balance),
            deals: RwLock::new(HashMap::new()),
            slippage_bps,
        }
    }
}

#[async_trait]
impl Venue for PaperVenue {
    async fn balance(&self) -> Result<f64> {
        Ok(*self.balance.read().await)
    }

    async fn submit_deal(&self, deal: &Deal) -> Result<()> {
        let mut deals = self.deals.write().await;
        if deals.contains_key(&deal.ticker) {
            return Err(Error::Venue(format!(
                "A deal is already open for {}",
                deal.ticker
            )));
        }
        debug!(
            ticker = %deal.ticker,
            direction = %deal.direction,
            notional = deal.open_notional,
            "Paper deal accepted"
        );
        deals.insert(deal.ticker.clone(), deal.clone());
        Ok(())
    }

    async fn close_deal(&self, deal: &Deal, close_price: f64) -> Result<()> {
        let removed = self
            .deals
            .write()
            .await
            .remove(&deal.ticker)
            .ok_or_else(|| Error::Venue(format!("No open deal for {}", deal.ticker)))?;

        // Slippage works against the closer: longs sell lower, shorts
        // cover higher.
        let slip = self.slippage_bps / 10_000.0;
        let fill_price = match removed.direction {
            Direction::Long => close_price * (1.0 - slip),
            Direction::Short => close_price * (1.0 + slip),
        };
        let entry = removed.entry_price();
        let pnl = match removed.direction {
            Direction::Long => removed.open_notional * (fill_price - entry) / entry,
            Direction::Short => removed.open_notional * (entry - fill_price) / entry,
        };
        let mut balance = self.balance.write().await;
        *balance += pnl;
        debug!(
            ticker = %removed.ticker,
            fill = fill_price,
            pnl = pnl,
            balance = *balance,
            "Paper deal closed"
        );
        Ok(())
    }

    async fn current_deal(&self, ticker: &str) -> Result<Option<Deal>> {
        Ok(self.deals.read().await.get(ticker).cloned())
    }

    async fn update_stop_loss(&self, deal: &Deal, new_stop: f64) -> Result<()> {
        let mut deals = self.deals.write().await;
        match deals.get_mut(&deal.ticker) {
            Some(open) => {
                open.stop_loss = new_stop;
                Ok(())
            }
            None => Err(Error::Venue(format!(
                "Stop update for unknown deal on {}",
                deal.ticker
            ))),
        }
    }
}
