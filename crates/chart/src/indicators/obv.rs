use serde::{Deserialize, Serialize};

use super::Ohlcv;

/// On-Balance Volume: cumulative volume starting at zero, adding on up
/// closes and subtracting on down closes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obv;

impl Obv {
    pub fn new() -> Self {
        Obv
    }

    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<f64>> {
        let n = bars.len();
        let mut out = vec![None; n];
        if n < 2 {
            return out;
        }

        let mut obv = 0.0;
        for i in 1..n {
            let current = bars[i].close();
            let previous = bars[i - 1].close();
            if current > previous {
                obv += bars[i].volume();
            } else if current < previous {
                obv -= bars[i].volume();
            }
            out[i] = Some(obv);
        }
        out
    }
}

impl Default for Obv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn needs_two_bars() {
        let bars = make_bars(&[10.0]);
        assert!(Obv.series(&bars).iter().all(|v| v.is_none()));
    }

    #[test]
    fn accumulates_signed_volume() {
        // up, down, flat, up with volume 1000 each
        let bars = make_bars(&[10.0, 11.0, 10.5, 10.5, 11.5]);
        let series = Obv.series(&bars);
        assert_eq!(series[1], Some(1000.0));
        assert_eq!(series[2], Some(0.0));
        assert_eq!(series[3], Some(0.0));
        assert_eq!(series[4], Some(1000.0));
    }
}
