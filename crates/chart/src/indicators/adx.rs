use serde::{Deserialize, Serialize};

use super::atr::true_range;
use super::Ohlcv;

/// Average Directional Index.
///
/// True range, +DM and -DM are Wilder-smoothed as running sums seeded over
/// the first `period` bars; +DI/-DI and DX follow from those, and the ADX
/// itself is seeded as the mean of the second `period`-sized window of DX
/// values before being Wilder-smoothed. The first value therefore needs
/// `2 * period` bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adx {
    pub period: usize,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self { period }
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<f64>> {
        let n = bars.len();
        let period = self.period;
        let mut out = vec![None; n];
        if n < 2 * period {
            return out;
        }

        let mut smoothed_tr = 0.0;
        let mut smoothed_plus_dm = 0.0;
        let mut smoothed_minus_dm = 0.0;
        let mut dx_sum = 0.0;
        let mut adx = 0.0;

        for i in 1..n {
            let tr = true_range(&bars[i], &bars[i - 1]);
            let up_move = bars[i].high() - bars[i - 1].high();
            let down_move = bars[i - 1].low() - bars[i].low();
            let plus_dm = if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            };
            let minus_dm = if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            };

            if i <= period {
                smoothed_tr += tr;
                smoothed_plus_dm += plus_dm;
                smoothed_minus_dm += minus_dm;
                if i < period {
                    continue;
                }
            } else {
                smoothed_tr = smoothed_tr - smoothed_tr / period as f64 + tr;
                smoothed_plus_dm = smoothed_plus_dm - smoothed_plus_dm / period as f64 + plus_dm;
                smoothed_minus_dm =
                    smoothed_minus_dm - smoothed_minus_dm / period as f64 + minus_dm;
            }

            let (plus_di, minus_di) = if smoothed_tr == 0.0 {
                (0.0, 0.0)
            } else {
                (
                    100.0 * smoothed_plus_dm / smoothed_tr,
                    100.0 * smoothed_minus_dm / smoothed_tr,
                )
            };
            let di_sum = plus_di + minus_di;
            let dx = if di_sum == 0.0 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / di_sum
            };

            if i < 2 * period - 1 {
                dx_sum += dx;
            } else if i == 2 * period - 1 {
                dx_sum += dx;
                adx = dx_sum / period as f64;
                out[i] = Some(adx);
            } else {
                adx = (adx * (period - 1) as f64 + dx) / period as f64;
                out[i] = Some(adx);
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
    fn needs_two_periods_of_history() {
        let closes: Vec<f64> = (0..27).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let series = Adx::new(14).series(&bars);
        assert!(series.iter().all(|v| v.is_none()));

        let closes: Vec<f64> = (0..28).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let series = Adx::new(14).series(&bars);
        assert!(series[26].is_none());
        assert!(series[27].is_some());
    }

    #[test]
    fn strong_uptrend_maxes_out() {
        // Every bar moves up and never down, so -DM stays zero and each DX
        // is 100; the smoothed ADX must be 100 as well.
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let adx = Adx::new(14).series(&bars)[29].unwrap();
        assert!((adx - 100.0).abs() < 1e-9, "expected 100, got {adx}");
    }

    #[test]
    fn stays_within_bounds() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + ((i * 29) % 17) as f64).collect();
        let bars = make_bars(&closes);
        for value in Adx::new(7).series(&bars).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "ADX out of bounds: {value}");
        }
    }
}
