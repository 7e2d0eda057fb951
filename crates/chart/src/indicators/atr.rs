use serde::{Deserialize, Serialize};

use super::Ohlcv;

/// Average True Range: Wilder-smoothed mean of the true range, seeded as a
/// simple mean of the first `period` true ranges. Needs `period + 1` bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atr {
    pub period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self { period }
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<f64>> {
        let n = bars.len();
        let period = self.period;
        let mut out = vec![None; n];
        if n < period + 1 {
            return out;
        }

        let mut sum = 0.0;
        for i in 1..=period {
            sum += true_range(&bars[i], &bars[i - 1]);
        }
        let mut atr = sum / period as f64;
        out[period] = Some(atr);

        for i in period + 1..n {
            let tr = true_range(&bars[i], &bars[i - 1]);
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
            out[i] = Some(atr);
        }
        out
    }
}

pub(crate) fn true_range<B: Ohlcv>(current: &B, previous: &B) -> f64 {
    let high_low = current.high() - current.low();
    let high_close = (current.high() - previous.close()).abs();
    let low_close = (current.low() - previous.close()).abs();
    high_low.max(high_close).max(low_close)
}
