use serde::{Deserialize, Serialize};

use super::atr::true_range;
use super::Ohlcv;

/// Simplified SuperTrend trend flag.
///
/// Computes the Wilder-smoothed ATR, derives the basic lower band
/// `midpoint - multiplier * atr` from the latest bar's high/low midpoint,
/// and emits +1 when the close sits above that band, -1 otherwise. The full
/// band-flip logic of the classic SuperTrend is intentionally not part of
/// this signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperTrend {
    pub atr_period: usize,
    pub multiplier: f64,
}

impl SuperTrend {
    pub fn new(atr_period: usize, multiplier: f64) -> Self {
        assert!(atr_period >= 1, "SuperTrend ATR period must be >= 1");
        assert!(
            multiplier.is_finite(),
            "SuperTrend multiplier must be finite"
        );
        Self {
            atr_period,
            multiplier,
        }
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<f64>> {
        let n = bars.len();
        let period = self.atr_period;
        let mut out = vec![None; n];
        if n < period + 1 {
            return out;
        }

        let mut sum = 0.0;
        for i in 1..=period {
            sum += true_range(&bars[i], &bars[i - 1]);
        }
        let mut atr = sum / period as f64;
        out[period] = Some(self.signal(&bars[period], atr));

        for i in period + 1..n {
            let tr = true_range(&bars[i], &bars[i - 1]);
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
            out[i] = Some(self.signal(&bars[i], atr));
        }
        out
    }

    fn signal<B: Ohlcv>(&self, bar: &B, atr: f64) -> f64 {
        let midpoint = (bar.high() + bar.low()) / 2.0;
        let basic_lower = midpoint - self.multiplier * atr;
        if bar.close() > basic_lower {
            1.0
        } else {
            -1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn insufficient_until_period_plus_one() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        assert!(SuperTrend::new(3, 3.0).series(&bars).iter().all(|v| v.is_none()));
    }

    #[test]
    fn wide_multiplier_flags_uptrend() {
        // With a generous band, a close near the midpoint stays above the
        // lower band and the flag is +1.
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        for value in SuperTrend::new(10, 3.0).series(&bars).into_iter().flatten() {
            assert_eq!(value, 1.0);
        }
    }

    #[test]
    fn signal_is_binary() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + ((i * 17) % 13) as f64).collect();
        let bars = make_bars(&closes);
        for value in SuperTrend::new(7, 0.1).series(&bars).into_iter().flatten() {
            assert!(value == 1.0 || value == -1.0);
        }
    }
}
