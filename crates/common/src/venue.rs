use async_trait::async_trait;

use crate::{Deal, Result};

/// Abstraction over the execution venue.
///
/// `PaperVenue` in `crates/paper` implements this for backtests and tests;
/// a live exchange adapter would implement it for real order flow. Only the
/// position manager holds a reference to a `dyn Venue`, so all order flow
/// goes through its state machine.
#[async_trait]
pub trait Venue: Send + Sync {
    /// Current account balance in quote currency.
    async fn balance(&self) -> Result<f64>;

    /// Submit a freshly opened deal to the venue.
    async fn submit_deal(&self, deal: &Deal) -> Result<()>;

    /// Close an open deal at the given price.
    async fn close_deal(&self, deal: &Deal, close_price: f64) -> Result<()>;

    /// The venue's authoritative view of the open deal for a ticker, if any.
    async fn current_deal(&self, ticker: &str) -> Result<Option<Deal>>;

    /// Move the venue-side protective stop order.
    async fn update_stop_loss(&self, deal: &Deal, new_stop: f64) -> Result<()>;
}
