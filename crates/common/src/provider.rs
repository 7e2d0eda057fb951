use async_trait::async_trait;

use crate::{Bar, Result, Timeframe};

/// Source of historical bars.
///
/// Implementations should return bars ordered by `open_time`. A parse
/// failure partway through must not discard what was already collected:
/// the loop aborts early and the bars read so far are returned.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        interval: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Bar>>;
}
