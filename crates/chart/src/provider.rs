//! Session-owned indicator cache over a base bar series and its
//! aggregated timeframes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use common::{Bar, Timeframe};

use crate::aggregator::{self, AggBar};
use crate::indicators::{IndicatorSpec, IndicatorValue};

type CacheKey = (IndicatorSpec, Timeframe);
type SeriesArc = Arc<Vec<Option<IndicatorValue>>>;

/// Holds the base (1-minute) series, the pre-aggregated coarser series,
/// and per-(indicator, timeframe) arrays of indicator values computed over
/// the full series in one pass.
///
/// Lookups for a prefix already covered by a stored array are O(1).
/// When the requested prefix exceeds what is stored, the whole series is
/// recomputed outside the lock and published atomically, so concurrent
/// readers of the same key see either the previous complete array or the
/// new one. Independent keys never contend beyond the brief map access.
///
/// The cache is owned by one session (backtest run or live loop), never
/// shared globally.
pub struct ChartData {
    cache_id: String,
    base: Vec<Bar>,
    frames: HashMap<Timeframe, Vec<AggBar>>,
    cache: RwLock<HashMap<CacheKey, SeriesArc>>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    spec: IndicatorSpec,
    timeframe: Timeframe,
    values: Vec<Option<IndicatorValue>>,
}

impl ChartData {
    /// In-memory cache over `base` with no disk snapshots.
    pub fn new(cache_id: impl Into<String>, base: Vec<Bar>) -> Self {
        Self {
            cache_id: cache_id.into(),
            frames: build_frames(&base),
            base,
            cache: RwLock::new(HashMap::new()),
            snapshot_path: None,
        }
    }

    /// Cache with disk persistence under `cache_dir`. A previous snapshot
    /// for the same cache id is restored if present; a missing or
    /// unreadable snapshot just means an empty cache.
    pub fn with_snapshot(cache_id: impl Into<String>, base: Vec<Bar>, cache_dir: &Path) -> Self {
        let mut chart = Self::new(cache_id, base);
        chart.snapshot_path = Some(snapshot_file(cache_dir, &chart.cache_id));
        chart.restore_snapshot();
        chart
    }

    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    pub fn base(&self) -> &[Bar] {
        &self.base
    }

    /// Length of the stored series at `timeframe` (including a trailing
    /// partial group for aggregated frames).
    pub fn series_len(&self, timeframe: Timeframe) -> usize {
        match timeframe {
            Timeframe::M1 => self.base.len(),
            tf => self.frames.get(&tf).map_or(0, Vec::len),
        }
    }

    /// How many `timeframe` bars a strategy may look at when `base_len`
    /// base bars are visible: the count of fully completed groups, so a
    /// partially-filled trailing group never feeds decision logic.
    pub fn visible_len(&self, timeframe: Timeframe, base_len: usize) -> usize {
        match timeframe {
            Timeframe::M1 => base_len,
            tf => aggregator::completed_len(base_len, tf),
        }
    }

    /// Indicator value for the first `prefix_len` bars of `timeframe`, or
    /// `None` when that prefix is too short for the indicator.
    pub fn get(
        &self,
        spec: &IndicatorSpec,
        timeframe: Timeframe,
        prefix_len: usize,
    ) -> Option<IndicatorValue> {
        if prefix_len == 0 {
            return None;
        }
        let key = (spec.clone(), timeframe);
        {
            let cache = self.cache.read().expect("indicator cache lock poisoned");
            if let Some(entry) = cache.get(&key) {
                if entry.len() >= prefix_len {
                    return entry[prefix_len - 1];
                }
            }
        }

        // History grew past the stored array (or first access): recompute
        // the full series outside the lock, publish on completion.
        let values: SeriesArc = Arc::new(match timeframe {
            Timeframe::M1 => spec.series(&self.base),
            tf => spec.series(self.frames.get(&tf).map(Vec::as_slice).unwrap_or(&[])),
        });
        debug!(indicator = %spec, timeframe = %timeframe, len = values.len(), "Indicator series computed");
        let result = values.get(prefix_len - 1).copied().flatten();
        {
            let mut cache = self.cache.write().expect("indicator cache lock poisoned");
            cache.insert(key, values);
        }
        self.save_snapshot();
        result
    }

    /// Append one base bar, extending or replacing the trailing group of
    /// every aggregated frame. Stored indicator arrays for aggregated
    /// frames are truncated back to the groups unaffected by this bar, so
    /// a value computed from a partially-filled group is never served once
    /// the group has grown.
    pub fn push_bar(&mut self, bar: Bar) {
        self.base.push(bar);
        let n = self.base.len();

        for timeframe in Timeframe::ALL {
            if timeframe == Timeframe::M1 {
                continue;
            }
            let factor = timeframe.minutes();
            let group_index = (n - 1) / factor;
            let group = aggregator::aggregate(&self.base[group_index * factor..], timeframe);
            let frame = self.frames.entry(timeframe).or_default();
            if group_index < frame.len() {
                frame[group_index] = group[0];
            } else {
                frame.push(group[0]);
            }
        }

        let mut cache = self.cache.write().expect("indicator cache lock poisoned");
        for ((_, timeframe), entry) in cache.iter_mut() {
            if *timeframe == Timeframe::M1 {
                continue;
            }
            let stable = (n - 1) / timeframe.minutes();
            if entry.len() > stable {
                *entry = Arc::new(entry[..stable].to_vec());
            }
        }
    }

    fn restore_snapshot(&mut self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable indicator cache snapshot — starting empty");
                return;
            }
        };
        match serde_json::from_str::<Vec<SnapshotEntry>>(&raw) {
            Ok(entries) => {
                let mut cache = self.cache.write().expect("indicator cache lock poisoned");
                let count = entries.len();
                for entry in entries {
                    cache.insert((entry.spec, entry.timeframe), Arc::new(entry.values));
                }
                debug!(entries = count, cache_id = %self.cache_id, "Indicator cache restored");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt indicator cache snapshot — starting empty");
            }
        }
    }

    fn save_snapshot(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let entries: Vec<SnapshotEntry> = {
            let cache = self.cache.read().expect("indicator cache lock poisoned");
            cache
                .iter()
                .map(|((spec, timeframe), values)| SnapshotEntry {
                    spec: spec.clone(),
                    timeframe: *timeframe,
                    values: values.as_ref().clone(),
                })
                .collect()
        };
        let json = match serde_json::to_string(&entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize indicator cache snapshot");
                return;
            }
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        // Whole-file replace via a temp file so a reader never observes a
        // partially written snapshot.
        let tmp = path.with_extension("tmp");
        if let Err(e) = std::fs::write(&tmp, json).and_then(|()| std::fs::rename(&tmp, path)) {
            warn!(path = %path.display(), error = %e, "Failed to write indicator cache snapshot");
        }
    }
}

fn build_frames(base: &[Bar]) -> HashMap<Timeframe, Vec<AggBar>> {
    Timeframe::ALL
        .into_iter()
        .filter(|tf| *tf != Timeframe::M1)
        .map(|tf| (tf, aggregator::aggregate(base, tf)))
        .collect()
}

fn snapshot_file(cache_dir: &Path, cache_id: &str) -> PathBuf {
    let digest = Sha256::digest(cache_id.as_bytes());
    cache_dir.join(format!("{}.json", hex::encode(digest)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, Ema, Rsi, Sma};

    fn ramp(n: usize) -> Vec<Bar> {
        make_bars(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
    }

    #[test]
    fn repeated_gets_are_bit_identical() {
        let chart = ChartData::new("test", ramp(120));
        let spec = IndicatorSpec::Rsi(Rsi::new(14));
        for prefix in [15, 60, 120] {
            let first = chart.get(&spec, Timeframe::M1, prefix);
            let second = chart.get(&spec, Timeframe::M1, prefix);
            assert_eq!(first, second);
            assert!(first.is_some());
        }
    }

    #[test]
    fn cached_value_matches_direct_calculation() {
        let bars = ramp(90);
        let chart = ChartData::new("test", bars.clone());
        let spec = IndicatorSpec::Ema(Ema::new(10));
        for prefix in [10, 45, 90] {
            let cached = chart.get(&spec, Timeframe::M1, prefix);
            let direct = spec.latest(&bars[..prefix]);
            assert_eq!(cached, direct);
        }
    }

    #[test]
    fn short_prefix_is_insufficient_not_an_error() {
        let chart = ChartData::new("test", ramp(40));
        let spec = IndicatorSpec::Rsi(Rsi::new(14));
        assert_eq!(chart.get(&spec, Timeframe::M1, 0), None);
        assert_eq!(chart.get(&spec, Timeframe::M1, 14), None);
        assert!(chart.get(&spec, Timeframe::M1, 15).is_some());
    }

    #[test]
    fn growth_recomputes_and_preserves_prefix_values() {
        let bars = ramp(80);
        let mut chart = ChartData::new("test", bars[..60].to_vec());
        let spec = IndicatorSpec::Rsi(Rsi::new(14));
        let before = chart.get(&spec, Timeframe::M1, 60);

        for bar in &bars[60..] {
            chart.push_bar(bar.clone());
        }
        let after_grow = chart.get(&spec, Timeframe::M1, 80);
        assert!(after_grow.is_some());
        // The value for the old prefix is unchanged by the growth.
        assert_eq!(chart.get(&spec, Timeframe::M1, 60), before);
    }

    #[test]
    fn completed_trailing_group_replaces_partial_value() {
        let bars = ramp(10);
        let mut chart = ChartData::new("test", bars[..7].to_vec());
        // SMA(1) of a group is just its aggregated close.
        let spec = IndicatorSpec::Sma(Sma::new(1));

        let partial = chart.get(&spec, Timeframe::M5, 2);
        assert_eq!(partial, Some(IndicatorValue::Scalar(bars[6].close)));

        for bar in &bars[7..] {
            chart.push_bar(bar.clone());
        }
        let completed = chart.get(&spec, Timeframe::M5, 2);
        assert_eq!(completed, Some(IndicatorValue::Scalar(bars[9].close)));
    }

    #[test]
    fn visible_len_hides_partial_groups() {
        let chart = ChartData::new("test", ramp(17));
        assert_eq!(chart.visible_len(Timeframe::M1, 17), 17);
        assert_eq!(chart.visible_len(Timeframe::M5, 17), 3);
        assert_eq!(chart.visible_len(Timeframe::M15, 17), 1);
        assert_eq!(chart.visible_len(Timeframe::H1, 17), 0);
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = std::env::temp_dir().join(format!("chart-snap-{}", uuid::Uuid::new_v4()));
        let spec = IndicatorSpec::Ema(Ema::new(5));

        let chart = ChartData::with_snapshot("BTCUSDT-1m-0-1000", ramp(40), &dir);
        let value = chart.get(&spec, Timeframe::M1, 40);
        assert!(value.is_some());

        // A fresh session with the same cache id serves the snapshotted
        // array without needing the bars at all.
        let restored = ChartData::with_snapshot("BTCUSDT-1m-0-1000", Vec::new(), &dir);
        assert_eq!(restored.get(&spec, Timeframe::M1, 40), value);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_snapshot_degrades_to_empty() {
        let dir = std::env::temp_dir().join(format!("chart-snap-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(snapshot_file(&dir, "corrupt-id"), b"not json at all").unwrap();

        let chart = ChartData::with_snapshot("corrupt-id", ramp(20), &dir);
        let spec = IndicatorSpec::Ema(Ema::new(5));
        // Still serves values, computed fresh rather than from the bad file.
        assert_eq!(
            chart.get(&spec, Timeframe::M1, 20),
            spec.latest(chart.base())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
