use std::collections::HashMap;

use tracing::info;

use chart::indicators::Macd;
use common::Timeframe;

use crate::config::{StrategyConfig, StrategyFileConfig};
use crate::{RsiMacdStrategy, Strategy, SuperTrendStrategy};

/// Builds and holds the strategy instances described by a config file.
pub struct StrategyRegistry {
    strategies: Vec<(String, Box<dyn Strategy>)>,
}

impl StrategyRegistry {
    /// Build the registry from config, exiting on unknown strategy types.
    pub fn from_config(file_cfg: &StrategyFileConfig) -> Self {
        let mut strategies = Vec::new();
        for cfg in &file_cfg.strategies {
            let strategy = build_strategy(cfg)
                .unwrap_or_else(|e| panic!("Unknown strategy type '{}': {e}", cfg.strategy_type));
            info!(name = %strategy.name(), ticker = %cfg.ticker, "Registered strategy");
            strategies.push((cfg.ticker.clone(), strategy));
        }
        Self { strategies }
    }

    /// (ticker, strategy) pairs in config order.
    pub fn strategies(&self) -> &[(String, Box<dyn Strategy>)] {
        &self.strategies
    }

    pub fn into_strategies(self) -> Vec<(String, Box<dyn Strategy>)> {
        self.strategies
    }
}

fn build_strategy(cfg: &StrategyConfig) -> Result<Box<dyn Strategy>, String> {
    match cfg.strategy_type.as_str() {
        "rsi-macd" => {
            let rsi_period = param_usize(&cfg.params, "rsi_period", 14);
            let oversold = param_f64(&cfg.params, "oversold", 40.0);
            let overbought = param_f64(&cfg.params, "overbought", 60.0);
            let fast = param_usize(&cfg.params, "fast", 12);
            let slow = param_usize(&cfg.params, "slow", 26);
            let signal = param_usize(&cfg.params, "signal", 9);
            Ok(Box::new(RsiMacdStrategy::new(
                cfg.name.clone(),
                rsi_period,
                oversold,
                overbought,
                Macd::new(fast, slow, signal),
            )))
        }
        "supertrend" => {
            let timeframe = match param_str(&cfg.params, "timeframe", "15m").as_str() {
                "1m" => Timeframe::M1,
                "5m" => Timeframe::M5,
                "15m" => Timeframe::M15,
                "30m" => Timeframe::M30,
                "1h" => Timeframe::H1,
                "4h" => Timeframe::H4,
                other => return Err(format!("unknown timeframe '{other}'")),
            };
            let atr_period = param_usize(&cfg.params, "atr_period", 10);
            let atr_multiplier = param_f64(&cfg.params, "atr_multiplier", 3.0);
            Ok(Box::new(SuperTrendStrategy::new(
                cfg.name.clone(),
                timeframe,
                atr_period,
                atr_multiplier,
            )))
        }
        other => Err(format!("unknown type '{other}'")),
    }
}

fn param_f64(params: &HashMap<String, toml::Value>, key: &str, default: f64) -> f64 {
    params.get(key).and_then(|v| v.as_float()).unwrap_or(default)
}

fn param_usize(params: &HashMap<String, toml::Value>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|v| v.as_integer())
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn param_str(params: &HashMap<String, toml::Value>, key: &str, default: &str) -> String {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_configured_strategies() {
        let raw = r#"
            [[strategy]]
            type = "rsi-macd"
            name = "confluence"
            ticker = "BTCUSDT"

            [strategy.params]
            oversold = 35.0

            [[strategy]]
            type = "supertrend"
            name = "trend"
            ticker = "ETHUSDT"

            [strategy.params]
            timeframe = "1h"
            atr_period = 14
        "#;
        let cfg: StrategyFileConfig = toml::from_str(raw).unwrap();
        let registry = StrategyRegistry::from_config(&cfg);
        assert_eq!(registry.strategies().len(), 2);
        assert_eq!(registry.strategies()[0].0, "BTCUSDT");
        assert_eq!(registry.strategies()[1].1.name(), "trend");
    }

    #[test]
    #[should_panic(expected = "Unknown strategy type")]
    fn unknown_type_panics() {
        let raw = r#"
            [[strategy]]
            type = "martingale"
            name = "nope"
            ticker = "BTCUSDT"
        "#;
        let cfg: StrategyFileConfig = toml::from_str(raw).unwrap();
        let _ = StrategyRegistry::from_config(&cfg);
    }
}
