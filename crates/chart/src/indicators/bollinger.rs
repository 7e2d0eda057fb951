use serde::{Deserialize, Serialize};

use super::Ohlcv;

/// Bollinger Bands: middle = SMA(period), upper/lower = middle plus/minus
/// `std_dev_multiplier` population standard deviations of the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bollinger {
    pub period: usize,
    pub std_dev_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bollinger {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        assert!(
            std_dev_multiplier.is_finite(),
            "Bollinger multiplier must be finite"
        );
        Self {
            period,
            std_dev_multiplier,
        }
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<Bands>> {
        let n = bars.len();
        let period = self.period;
        let mut out = vec![None; n];
        for i in period - 1..n {
            let window = &bars[i + 1 - period..=i];
            let middle = window.iter().map(|b| b.close()).sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|b| {
                    let diff = b.close() - middle;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            let offset = self.std_dev_multiplier * variance.sqrt();
            out[i] = Some(Bands {
                upper: middle + offset,
                middle,
                lower: middle - offset,
            });
        }
        out
    }
}
