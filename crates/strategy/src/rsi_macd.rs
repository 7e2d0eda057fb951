use chart::indicators::{Macd, Rsi};
use chart::{ChartData, IndicatorSpec};
use common::{Decision, DecisionReason, Timeframe};

/// RSI/MACD confluence on the base timeframe: go long when RSI dips below
/// the oversold level while the MACD histogram is bullish, short on the
/// mirrored condition.
pub struct RsiMacdStrategy {
    name: String,
    rsi: IndicatorSpec,
    macd: IndicatorSpec,
    oversold: f64,
    overbought: f64,
}

impl RsiMacdStrategy {
    pub fn new(
        name: impl Into<String>,
        rsi_period: usize,
        oversold: f64,
        overbought: f64,
        macd: Macd,
    ) -> Self {
        Self {
            name: name.into(),
            rsi: IndicatorSpec::Rsi(Rsi::new(rsi_period)),
            macd: IndicatorSpec::Macd(macd),
            oversold,
            overbought,
        }
    }
}

impl Default for RsiMacdStrategy {
    fn default() -> Self {
        Self::new("rsi-macd", 14, 40.0, 60.0, Macd::new(12, 26, 9))
    }
}

impl super::Strategy for RsiMacdStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, chart: &ChartData, prefix_len: usize) -> DecisionReason {
        let rsi = chart
            .get(&self.rsi, Timeframe::M1, prefix_len)
            .and_then(|v| v.as_scalar());
        let macd = chart
            .get(&self.macd, Timeframe::M1, prefix_len)
            .and_then(|v| v.as_macd());

        let (Some(rsi), Some((histogram, _signal_line))) = (rsi, macd) else {
            return DecisionReason::hold("No clear signal");
        };

        if rsi < self.oversold && histogram > 0.0 {
            DecisionReason::new(
                Decision::Long,
                format!("RSI is below {} and MACD is bullish {rsi:.2} {histogram:.4}", self.oversold),
            )
        } else if rsi > self.overbought && histogram < 0.0 {
            DecisionReason::new(
                Decision::Short,
                format!("RSI is above {} and MACD is bearish {rsi:.2} {histogram:.4}", self.overbought),
            )
        } else {
            DecisionReason::hold("No clear signal")
        }
    }
}
