use serde::{Deserialize, Serialize};

use super::Ohlcv;

/// Moving Average Convergence/Divergence.
///
/// Fast and slow EMAs run in lock-step over the closes; the MACD line
/// exists from bar `slow - 1` on. The signal line is an EMA of the MACD
/// line seeded with the first MACD value itself. Needs `slow` bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// One MACD evaluation.
///
/// `macd` holds the histogram (MACD line minus signal line), not the raw
/// MACD line; strategy thresholds were written against the histogram, so
/// the field keeps that meaning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal_line: f64,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be less than slow period");
        Self { fast, slow, signal }
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<MacdPoint>> {
        let n = bars.len();
        let mut out = vec![None; n];
        if n < self.slow {
            return out;
        }

        let k_fast = 2.0 / (self.fast as f64 + 1.0);
        let k_slow = 2.0 / (self.slow as f64 + 1.0);
        let k_signal = 2.0 / (self.signal as f64 + 1.0);

        let mut fast_sum = 0.0;
        let mut slow_sum = 0.0;
        let mut fast_ema = 0.0;
        let mut slow_ema = 0.0;
        let mut signal_ema = 0.0;

        for (i, bar) in bars.iter().enumerate() {
            let close = bar.close();

            if i < self.fast {
                fast_sum += close;
                if i == self.fast - 1 {
                    fast_ema = fast_sum / self.fast as f64;
                }
            } else {
                fast_ema = (close - fast_ema) * k_fast + fast_ema;
            }

            if i < self.slow {
                slow_sum += close;
                if i == self.slow - 1 {
                    slow_ema = slow_sum / self.slow as f64;
                }
            } else {
                slow_ema = (close - slow_ema) * k_slow + slow_ema;
            }

            if i >= self.slow - 1 {
                let macd_line = fast_ema - slow_ema;
                if i == self.slow - 1 {
                    signal_ema = macd_line;
                } else {
                    signal_ema = (macd_line - signal_ema) * k_signal + signal_ema;
                }
                out[i] = Some(MacdPoint {
                    macd: macd_line - signal_ema,
                    signal_line: signal_ema,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn insufficient_below_slow() {
        let bars = make_bars(&[100.0; 25]);
        assert!(Macd::new(12, 26, 9).series(&bars).iter().all(|v| v.is_none()));
    }

    #[test]
    fn first_point_has_zero_histogram() {
        let closes: Vec<f64> = (0..26).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let series = Macd::new(12, 26, 9).series(&bars);
        let first = series[25].unwrap();
        // Signal is seeded with the first MACD value, so the histogram
        // opens at exactly zero.
        assert!(first.macd.abs() < 1e-12);
        assert!((first.signal_line).abs() > 0.0);
    }

    #[test]
    fn rising_series_keeps_a_positive_histogram() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5).collect();
        let bars = make_bars(&closes);
        let series = Macd::new(12, 26, 9).series(&bars);
        // While the MACD line is still climbing toward its asymptote the
        // signal trails it, so every histogram value past the seed is > 0.
        for point in series.into_iter().skip(26).flatten() {
            assert!(point.macd > 0.0, "histogram should be positive, got {}", point.macd);
        }
    }

    #[test]
    fn flat_series_stays_at_zero() {
        let bars = make_bars(&[100.0; 60]);
        for point in Macd::new(12, 26, 9).series(&bars).into_iter().flatten() {
            assert!(point.macd.abs() < 1e-9);
            assert!(point.signal_line.abs() < 1e-9);
        }
    }
}
