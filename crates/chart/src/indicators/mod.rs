//! Indicator engine: one module per indicator, each a pure function of the
//! bar prefix it is given. `IndicatorSpec` is the closed set of indicator
//! identities used as cache keys; `IndicatorValue` the result variants.
//! "Not enough history" is an ordinary outcome (`None`), never an error.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod supertrend;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::Bollinger;
pub use ema::Ema;
pub use macd::Macd;
pub use obv::Obv;
pub use rsi::Rsi;
pub use sma::Sma;
pub use supertrend::SuperTrend;

/// Read contract the indicator engine needs from a bar. Both base [`Bar`]s
/// and aggregated bars satisfy it.
///
/// [`Bar`]: common::Bar
pub trait Ohlcv {
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

impl Ohlcv for common::Bar {
    fn high(&self) -> f64 {
        self.high
    }
    fn low(&self) -> f64 {
        self.low
    }
    fn close(&self) -> f64 {
        self.close
    }
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Identity of one indicator instance: kind plus parameters. Two specs with
/// the same kind and parameters are the same cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndicatorSpec {
    Rsi(Rsi),
    Atr(Atr),
    Ema(Ema),
    Sma(Sma),
    Macd(Macd),
    Bollinger(Bollinger),
    SuperTrend(SuperTrend),
    Adx(Adx),
    Obv(Obv),
}

// Parameters are validated finite at construction, so float equality is
// total here and the key can live in a HashMap.
impl Eq for IndicatorSpec {}

impl Hash for IndicatorSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            IndicatorSpec::Rsi(p) => p.period.hash(state),
            IndicatorSpec::Atr(p) => p.period.hash(state),
            IndicatorSpec::Ema(p) => p.period.hash(state),
            IndicatorSpec::Sma(p) => p.period.hash(state),
            IndicatorSpec::Macd(p) => {
                p.fast.hash(state);
                p.slow.hash(state);
                p.signal.hash(state);
            }
            IndicatorSpec::Bollinger(p) => {
                p.period.hash(state);
                p.std_dev_multiplier.to_bits().hash(state);
            }
            IndicatorSpec::SuperTrend(p) => {
                p.atr_period.hash(state);
                p.multiplier.to_bits().hash(state);
            }
            IndicatorSpec::Adx(p) => p.period.hash(state),
            IndicatorSpec::Obv(_) => {}
        }
    }
}

impl std::fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorSpec::Rsi(p) => write!(f, "rsi({})", p.period),
            IndicatorSpec::Atr(p) => write!(f, "atr({})", p.period),
            IndicatorSpec::Ema(p) => write!(f, "ema({})", p.period),
            IndicatorSpec::Sma(p) => write!(f, "sma({})", p.period),
            IndicatorSpec::Macd(p) => write!(f, "macd({},{},{})", p.fast, p.slow, p.signal),
            IndicatorSpec::Bollinger(p) => {
                write!(f, "bollinger({},{})", p.period, p.std_dev_multiplier)
            }
            IndicatorSpec::SuperTrend(p) => {
                write!(f, "supertrend({},{})", p.atr_period, p.multiplier)
            }
            IndicatorSpec::Adx(p) => write!(f, "adx({})", p.period),
            IndicatorSpec::Obv(_) => write!(f, "obv"),
        }
    }
}

/// Result of one indicator evaluation.
///
/// NOTE on `Macd`: the `macd` field carries the histogram (MACD line minus
/// signal line), matching the observable behavior strategies were written
/// against; the raw MACD line is not exposed. This is a known naming
/// inconsistency kept for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IndicatorValue {
    Scalar(f64),
    Macd { macd: f64, signal_line: f64 },
    Bollinger { upper: f64, middle: f64, lower: f64 },
}

impl IndicatorValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            IndicatorValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_macd(&self) -> Option<(f64, f64)> {
        match self {
            IndicatorValue::Macd { macd, signal_line } => Some((*macd, *signal_line)),
            _ => None,
        }
    }

    pub fn as_bollinger(&self) -> Option<(f64, f64, f64)> {
        match self {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => Some((*upper, *middle, *lower)),
            _ => None,
        }
    }
}

impl IndicatorSpec {
    /// Evaluate the indicator at every index of `bars` in one pass. The
    /// value at index `i` equals the pure calculation over the prefix
    /// `bars[..=i]`; indices before the indicator's minimum history are
    /// `None`.
    pub fn series<B: Ohlcv>(&self, bars: &[B]) -> Vec<Option<IndicatorValue>> {
        match self {
            IndicatorSpec::Rsi(p) => scalars(p.series(bars)),
            IndicatorSpec::Atr(p) => scalars(p.series(bars)),
            IndicatorSpec::Ema(p) => scalars(p.series(bars)),
            IndicatorSpec::Sma(p) => scalars(p.series(bars)),
            IndicatorSpec::SuperTrend(p) => scalars(p.series(bars)),
            IndicatorSpec::Adx(p) => scalars(p.series(bars)),
            IndicatorSpec::Obv(p) => scalars(p.series(bars)),
            IndicatorSpec::Macd(p) => p
                .series(bars)
                .into_iter()
                .map(|point| {
                    point.map(|pt| IndicatorValue::Macd {
                        macd: pt.macd,
                        signal_line: pt.signal_line,
                    })
                })
                .collect(),
            IndicatorSpec::Bollinger(p) => p
                .series(bars)
                .into_iter()
                .map(|bands| {
                    bands.map(|b| IndicatorValue::Bollinger {
                        upper: b.upper,
                        middle: b.middle,
                        lower: b.lower,
                    })
                })
                .collect(),
        }
    }

    /// Evaluate over the full prefix and return the value for the latest
    /// bar, or `None` when the history is too short.
    pub fn latest<B: Ohlcv>(&self, bars: &[B]) -> Option<IndicatorValue> {
        self.series(bars).pop().flatten()
    }
}

fn scalars(values: Vec<Option<f64>>) -> Vec<Option<IndicatorValue>> {
    values
        .into_iter()
        .map(|v| v.map(IndicatorValue::Scalar))
        .collect()
}

/// Create synthetic bars from close prices for tests: open = previous
/// close, high/low bracket open and close by 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<common::Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            common::Bar {
                open_time: i as i64 * 60_000,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
                close_time: (i as i64 + 1) * 60_000 - 1,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(spec: &IndicatorSpec) -> u64 {
        let mut hasher = DefaultHasher::new();
        spec.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_specs_hash_equal() {
        let a = IndicatorSpec::Bollinger(Bollinger::new(20, 2.0));
        let b = IndicatorSpec::Bollinger(Bollinger::new(20, 2.0));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn different_params_are_different_keys() {
        let a = IndicatorSpec::Rsi(Rsi::new(14));
        let b = IndicatorSpec::Rsi(Rsi::new(7));
        assert_ne!(a, b);

        let c = IndicatorSpec::SuperTrend(SuperTrend::new(10, 3.0));
        let d = IndicatorSpec::SuperTrend(SuperTrend::new(10, 2.0));
        assert_ne!(c, d);
        assert_ne!(hash_of(&c), hash_of(&d));
    }

    #[test]
    fn latest_matches_series_tail() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.5, 12.5, 13.0, 12.0, 13.5]);
        let spec = IndicatorSpec::Ema(Ema::new(3));
        let series = spec.series(&bars);
        assert_eq!(spec.latest(&bars), series[bars.len() - 1]);
    }

    #[test]
    fn spec_round_trips_through_json() {
        let spec = IndicatorSpec::Macd(Macd::new(12, 26, 9));
        let json = serde_json::to_string(&spec).unwrap();
        let back: IndicatorSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
