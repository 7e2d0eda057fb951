use serde::{Deserialize, Serialize};

use super::Ohlcv;

/// Simple moving average of the trailing `period` close prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sma {
    pub period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<f64>> {
        let n = bars.len();
        let period = self.period;
        let mut out = vec![None; n];
        for i in period - 1..n {
            let window = &bars[i + 1 - period..=i];
            let sum: f64 = window.iter().map(|b| b.close()).sum();
            out[i] = Some(sum / period as f64);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn mean_of_trailing_window() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = Sma::new(3).series(&bars);
        assert!(series[0].is_none());
        assert!(series[1].is_none());
        assert!((series[2].unwrap() - 2.0).abs() < 1e-12);
        assert!((series[3].unwrap() - 3.0).abs() < 1e-12);
        assert!((series[4].unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn insufficient_below_period() {
        let bars = make_bars(&[1.0, 2.0]);
        assert!(Sma::new(5).series(&bars).iter().all(|v| v.is_none()));
    }
}
