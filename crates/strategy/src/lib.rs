pub mod config;
pub mod registry;
pub mod rsi_macd;
pub mod supertrend;

pub use config::{StrategyConfig, StrategyFileConfig};
pub use registry::StrategyRegistry;
pub use rsi_macd::RsiMacdStrategy;
pub use supertrend::SuperTrendStrategy;

use chart::ChartData;
use common::DecisionReason;

/// A trading policy: turns the current indicator state into a decision.
///
/// `prefix_len` is the number of base-resolution bars visible so far; the
/// strategy derives coarser-timeframe prefixes through
/// [`ChartData::visible_len`]. Indicators that have not seen enough
/// history return `None`, which strategies conventionally translate into
/// a HOLD; a missing signal is not an error.
pub trait Strategy: Send + Sync {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// Evaluate the visible history and produce a decision with a reason.
    fn decide(&self, chart: &ChartData, prefix_len: usize) -> DecisionReason;
}
