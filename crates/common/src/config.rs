/// Runtime configuration loaded from environment variables at startup.
/// Every variable is optional and falls back to a sensible default; a value
/// that is present but malformed causes an immediate panic with a clear
/// message.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether indicator series are snapshotted to disk.
    pub indicator_cache: bool,
    /// Directory holding indicator cache snapshots.
    pub cache_dir: String,
    /// Interval between venue polls while waiting for order settlement.
    pub settle_poll_ms: u64,
    /// Total time to wait for the venue to confirm a submitted deal.
    pub settle_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indicator_cache: false,
            cache_dir: "indicator-cache".to_string(),
            settle_poll_ms: 100,
            settle_timeout_ms: 2_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables. Loads `.env` if
    /// present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let defaults = Config::default();
        Config {
            indicator_cache: parsed_env("INDICATOR_CACHE", defaults.indicator_cache),
            cache_dir: optional_env("INDICATOR_CACHE_DIR").unwrap_or(defaults.cache_dir),
            settle_poll_ms: parsed_env("SETTLE_POLL_MS", defaults.settle_poll_ms),
            settle_timeout_ms: parsed_env("SETTLE_TIMEOUT_MS", defaults.settle_timeout_ms),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match optional_env(key) {
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("Environment variable '{key}' has invalid value: '{raw}'")),
        None => default,
    }
}
