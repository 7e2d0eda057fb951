use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level strategy config file (TOML).
///
/// Example:
/// ```toml
/// [[strategy]]
/// type = "rsi-macd"
/// name = "BTC RSI/MACD confluence"
/// ticker = "BTCUSDT"
///
/// [strategy.params]
/// rsi_period = 14
/// oversold = 40.0
/// overbought = 60.0
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy")]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy type identifier: "rsi-macd" or "supertrend".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Human-readable name shown in logs and deal messages.
    pub name: String,
    /// Ticker this strategy watches, e.g. "BTCUSDT".
    pub ticker: String,
    /// Strategy-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

impl StrategyFileConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read strategy config at '{path}': {e}"));
        toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse strategy config at '{path}': {e}"))
    }
}
