use chart::indicators::{Atr, SuperTrend};
use chart::{ChartData, IndicatorSpec};
use common::{Decision, DecisionReason, Timeframe};

/// Trend following on an aggregated timeframe, with ATR-derived dynamic
/// stops: follows the SuperTrend flag on `timeframe` and attaches a
/// stop-loss one ATR multiple away from the current price plus a
/// take-profit twice as far.
pub struct SuperTrendStrategy {
    name: String,
    timeframe: Timeframe,
    supertrend: IndicatorSpec,
    atr: IndicatorSpec,
    atr_multiplier: f64,
}

impl SuperTrendStrategy {
    pub fn new(
        name: impl Into<String>,
        timeframe: Timeframe,
        atr_period: usize,
        atr_multiplier: f64,
    ) -> Self {
        Self {
            name: name.into(),
            timeframe,
            supertrend: IndicatorSpec::SuperTrend(SuperTrend::new(atr_period, atr_multiplier)),
            atr: IndicatorSpec::Atr(Atr::new(atr_period)),
            atr_multiplier,
        }
    }
}

impl Default for SuperTrendStrategy {
    fn default() -> Self {
        Self::new("supertrend", Timeframe::M15, 10, 3.0)
    }
}

impl super::Strategy for SuperTrendStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, chart: &ChartData, prefix_len: usize) -> DecisionReason {
        let visible = chart.visible_len(self.timeframe, prefix_len);
        let trend = chart
            .get(&self.supertrend, self.timeframe, visible)
            .and_then(|v| v.as_scalar());
        // The stop distance uses the base-timeframe ATR so it tracks the
        // price scale the trader closes against.
        let atr = chart
            .get(&self.atr, Timeframe::M1, prefix_len)
            .and_then(|v| v.as_scalar());

        let (Some(trend), Some(atr)) = (trend, atr) else {
            return DecisionReason::hold("No clear signal");
        };
        let Some(bar) = chart.base().get(prefix_len - 1) else {
            return DecisionReason::hold("No clear signal");
        };
        let price = bar.close;
        let distance = self.atr_multiplier * atr;

        if trend > 0.0 {
            DecisionReason::new(
                Decision::Long,
                format!("SuperTrend {} is bullish", self.timeframe),
            )
            .with_stops(Some(price - distance), Some(price + 2.0 * distance))
        } else {
            DecisionReason::new(
                Decision::Short,
                format!("SuperTrend {} is bearish", self.timeframe),
            )
            .with_stops(Some(price + distance), Some(price - 2.0 * distance))
        }
    }
}
