use serde::{Deserialize, Serialize};

use super::Ohlcv;

/// Exponential Moving Average over close prices, seeded with the simple
/// mean of the first `period` closes, multiplier `2 / (period + 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ema {
    pub period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self { period }
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<f64>> {
        let n = bars.len();
        let period = self.period;
        let mut out = vec![None; n];
        if n < period {
            return out;
        }

        let multiplier = 2.0 / (period as f64 + 1.0);
        let mut ema = bars[..period].iter().map(|b| b.close()).sum::<f64>() / period as f64;
        out[period - 1] = Some(ema);

        for i in period..n {
            ema = (bars[i].close() - ema) * multiplier + ema;
            out[i] = Some(ema);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn first_value_is_simple_mean() {
        let bars = make_bars(&[2.0, 4.0, 6.0, 8.0]);
        let series = Ema::new(3).series(&bars);
        assert!(series[1].is_none());
        assert!((series[2].unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn recurrence_step() {
        let bars = make_bars(&[2.0, 4.0, 6.0, 8.0]);
        let series = Ema::new(3).series(&bars);
        // multiplier = 0.5; (8 - 4) * 0.5 + 4 = 6
        assert!((series[3].unwrap() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn tracks_a_constant_series_exactly() {
        let bars = make_bars(&[42.0; 20]);
        for value in Ema::new(5).series(&bars).into_iter().flatten() {
            assert!((value - 42.0).abs() < 1e-12);
        }
    }

    #[test]
    fn insufficient_below_period() {
        let bars = make_bars(&[1.0, 2.0]);
        assert!(Ema::new(3).series(&bars).iter().all(|v| v.is_none()));
    }
}
