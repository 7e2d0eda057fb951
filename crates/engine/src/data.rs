use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use common::{Bar, DataProvider, Error, Result, Timeframe};

/// Historical data provider backed by a JSON file of kline rows in the
/// exchange export layout: `[openTime, open, high, low, close, volume,
/// closeTime, ...]`, prices given as numbers or strings.
///
/// A malformed row aborts the parse loop early and whatever was collected
/// up to that point is returned, so one bad row does not discard the rest
/// of the history.
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataProvider for FileProvider {
    async fn fetch(
        &self,
        symbol: &str,
        interval: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Bar>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&raw)?;

        let mut bars = Vec::new();
        for row in &rows {
            match parse_kline(row) {
                Ok(bar) => {
                    if bar.open_time >= start_ms && bar.open_time < end_ms {
                        bars.push(bar);
                    }
                }
                Err(e) => {
                    warn!(
                        symbol = symbol,
                        interval = %interval,
                        collected = bars.len(),
                        error = %e,
                        "Malformed kline row — returning what was collected"
                    );
                    break;
                }
            }
        }
        debug!(symbol = symbol, interval = %interval, bars = bars.len(), "Historical data loaded");
        Ok(bars)
    }
}

fn parse_kline(row: &serde_json::Value) -> Result<Bar> {
    let fields = row
        .as_array()
        .ok_or_else(|| Error::Parse("kline row is not an array".to_string()))?;
    if fields.len() < 7 {
        return Err(Error::Parse(format!(
            "kline row has {} fields, expected at least 7",
            fields.len()
        )));
    }
    Ok(Bar {
        open_time: int_field(&fields[0], "openTime")?,
        open: num_field(&fields[1], "open")?,
        high: num_field(&fields[2], "high")?,
        low: num_field(&fields[3], "low")?,
        close: num_field(&fields[4], "close")?,
        volume: num_field(&fields[5], "volume")?,
        close_time: int_field(&fields[6], "closeTime")?,
    })
}

fn int_field(value: &serde_json::Value, name: &str) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::Parse(format!("kline field '{name}' is not an integer: {value}")))
}

fn num_field(value: &serde_json::Value, name: &str) -> Result<f64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::Parse(format!("kline field '{name}' is not a number"))),
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|_| Error::Parse(format!("kline field '{name}' is not numeric: '{s}'"))),
        other => Err(Error::Parse(format!(
            "kline field '{name}' has unexpected type: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("klines-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn parses_exchange_layout_with_string_prices() {
        let path = temp_file(
            r#"[
                [0, "100.0", "101.0", "99.0", "100.5", "12.5", 59999, "ignored"],
                [60000, 100.5, 102.0, 100.0, 101.5, 9.25, 119999]
            ]"#,
        );
        let provider = FileProvider::new(&path);
        let bars = provider
            .fetch("BTCUSDT", Timeframe::M1, 0, i64::MAX)
            .await
            .unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[1].open_time, 60_000);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn malformed_row_returns_collected_prefix() {
        let path = temp_file(
            r#"[
                [0, "100.0", "101.0", "99.0", "100.5", "12.5", 59999],
                [60000, "100.5", "102.0", "100.0", "101.5", "9.25", 119999],
                ["broken", "row"],
                [120000, "101.5", "103.0", "101.0", "102.5", "7.75", 179999]
            ]"#,
        );
        let provider = FileProvider::new(&path);
        let bars = provider
            .fetch("BTCUSDT", Timeframe::M1, 0, i64::MAX)
            .await
            .unwrap();

        // Parsing stops at the broken row; the later valid row is dropped.
        assert_eq!(bars.len(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn filters_by_open_time_range() {
        let path = temp_file(
            r#"[
                [0, "1", "2", "0", "1", "1", 59999],
                [60000, "1", "2", "0", "1", "1", 119999],
                [120000, "1", "2", "0", "1", "1", 179999]
            ]"#,
        );
        let provider = FileProvider::new(&path);
        let bars = provider
            .fetch("BTCUSDT", Timeframe::M1, 60_000, 120_000)
            .await
            .unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open_time, 60_000);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let provider = FileProvider::new("/nonexistent/klines.json");
        let err = provider
            .fetch("BTCUSDT", Timeframe::M1, 0, i64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
