//! Timeframe aggregation: groups consecutive base-resolution bars into
//! coarser bars (5x/15x/... the base span).

use common::{Bar, Timeframe};

use crate::indicators::Ohlcv;

/// An aggregated bar. Carries only the fields the indicator engine reads;
/// open price and timestamps of the group are not part of the aggregate
/// contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggBar {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Ohlcv for AggBar {
    fn high(&self) -> f64 {
        self.high
    }
    fn low(&self) -> f64 {
        self.low
    }
    fn close(&self) -> f64 {
        self.close
    }
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Convert a base (1-minute) series into `timeframe` bars by grouping
/// consecutive runs of `timeframe.minutes()` bars. The final group may be
/// shorter when the input length is not a multiple of the factor; callers
/// that must not see a partially-filled group should cap their view at
/// [`completed_len`].
///
/// Group `g` depends only on its own input bars, so re-aggregating a longer
/// input leaves all completed groups unchanged and only replaces the
/// trailing partial group.
pub fn aggregate(bars: &[Bar], timeframe: Timeframe) -> Vec<AggBar> {
    let factor = timeframe.minutes();
    bars.chunks(factor).map(aggregate_group).collect()
}

/// Number of fully completed `timeframe` groups in a base prefix of
/// `base_len` bars.
pub fn completed_len(base_len: usize, timeframe: Timeframe) -> usize {
    base_len / timeframe.minutes()
}

fn aggregate_group(group: &[Bar]) -> AggBar {
    let mut high = f64::MIN;
    let mut low = f64::MAX;
    let mut volume = 0.0;
    for bar in group {
        high = high.max(bar.high);
        low = low.min(bar.low);
        volume += bar.volume;
    }
    AggBar {
        high,
        low,
        close: group[group.len() - 1].close,
        volume,
    }
}
