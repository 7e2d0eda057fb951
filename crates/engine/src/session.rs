use tracing::info;

use chart::ChartData;
use common::Deal;
use strategy::Strategy;
use trader::{Performance, Trader};

/// Result of one replay session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub performance: Performance,
    pub closed_deals: Vec<Deal>,
    /// A deal still open when the series ran out, if any.
    pub open_deal: Option<Deal>,
    pub final_balance: f64,
}

/// Replays a bar series through a strategy and the position manager.
///
/// Each iteration grows the visible prefix by one bar, asks the strategy
/// for a decision over that prefix, and feeds the decision plus the latest
/// bar to the trader. Strictly sequential and deterministic: the outcome
/// depends only on the bar series and the strategy.
pub struct Session {
    chart: ChartData,
    strategy: Box<dyn Strategy>,
    trader: Trader,
}

impl Session {
    pub fn new(chart: ChartData, strategy: Box<dyn Strategy>, trader: Trader) -> Self {
        Self {
            chart,
            strategy,
            trader,
        }
    }

    /// Build a session honoring the environment configuration: indicator
    /// cache snapshots are enabled under the configured cache directory
    /// when `INDICATOR_CACHE` is set.
    pub fn from_env(
        cache_id: impl Into<String>,
        bars: Vec<common::Bar>,
        strategy: Box<dyn Strategy>,
        trader: Trader,
    ) -> Self {
        let cfg = common::Config::from_env();
        let chart = if cfg.indicator_cache {
            ChartData::with_snapshot(cache_id, bars, std::path::Path::new(&cfg.cache_dir))
        } else {
            ChartData::new(cache_id, bars)
        };
        Self::new(chart, strategy, trader)
    }

    pub async fn run(mut self) -> SessionReport {
        let total = self.chart.base().len();
        info!(
            bars = total,
            strategy = %self.strategy.name(),
            cache_id = %self.chart.cache_id(),
            "Replay session started"
        );

        for i in 0..total {
            let prefix_len = i + 1;
            let bar = self.chart.base()[i].clone();
            let reason = self.strategy.decide(&self.chart, prefix_len);
            self.trader.on_decision(&reason, &bar).await;
        }

        let performance = self.trader.performance();
        info!(
            wins = performance.wins,
            losses = performance.losses,
            win_rate_pct = performance.win_rate_pct,
            final_balance = performance.final_balance,
            "Replay session finished"
        );
        SessionReport {
            closed_deals: self.trader.closed_deals().to_vec(),
            open_deal: self.trader.current_deal().cloned(),
            final_balance: self.trader.balance(),
            performance,
        }
    }
}
