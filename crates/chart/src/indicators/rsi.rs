use serde::{Deserialize, Serialize};

use super::Ohlcv;

/// Relative Strength Index over close prices.
///
/// Seeds average gain/loss as simple means of the first `period` price
/// changes, then applies Wilder smoothing: the side that did not move this
/// bar decays by `(period - 1) / period`. Needs `period + 1` bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsi {
    pub period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self { period }
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<f64>> {
        let n = bars.len();
        let period = self.period;
        let mut out = vec![None; n];
        if n < period + 1 {
            return out;
        }

        let mut gain = 0.0;
        let mut loss = 0.0;
        for i in 1..=period {
            let change = bars[i].close() - bars[i - 1].close();
            if change > 0.0 {
                gain += change;
            } else {
                loss += change.abs();
            }
        }
        let mut avg_gain = gain / period as f64;
        let mut avg_loss = loss / period as f64;
        out[period] = Some(rsi_value(avg_gain, avg_loss));

        for i in period + 1..n {
            let change = bars[i].close() - bars[i - 1].close();
            if change > 0.0 {
                avg_gain = (avg_gain * (period - 1) as f64 + change) / period as f64;
                avg_loss = avg_loss * (period - 1) as f64 / period as f64;
            } else {
                avg_loss = (avg_loss * (period - 1) as f64 + change.abs()) / period as f64;
                avg_gain = avg_gain * (period - 1) as f64 / period as f64;
            }
            out[i] = Some(rsi_value(avg_gain, avg_loss));
        }
        out
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn insufficient_until_period_plus_one() {
        let bars = make_bars(&[100.0; 14]);
        let series = Rsi::new(14).series(&bars);
        assert!(series.iter().all(|v| v.is_none()));

        let bars = make_bars(&(0..15).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let series = Rsi::new(14).series(&bars);
        assert!(series[13].is_none());
        assert!(series[14].is_some());
    }

    #[test]
    fn classic_reference_sequence() {
        // Wilder's worked example: 14-period RSI over these closes ~ 70.5.
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28,
        ];
        let bars = make_bars(&closes);
        let rsi = Rsi::new(14).series(&bars)[14].unwrap();
        assert!((rsi - 70.5).abs() < 0.1, "expected ~70.5, got {rsi}");
    }

    #[test]
    fn all_gains_is_exactly_100() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let series = Rsi::new(3).series(&bars);
        for value in series.into_iter().flatten() {
            assert_eq!(value, 100.0);
        }
    }

    #[test]
    fn always_within_bounds() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i * 37) % 11) as f64 - 5.0)
            .collect();
        let bars = make_bars(&closes);
        for value in Rsi::new(14).series(&bars).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "RSI out of bounds: {value}");
        }
    }
}
