use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar at the base resolution (1-minute klines).
/// Bars are produced by a data provider and never mutated; a valid series
/// is ordered by strictly increasing `open_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open timestamp, milliseconds since epoch.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Bar close timestamp, milliseconds since epoch.
    pub close_time: i64,
}

impl Bar {
    pub fn close_time_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.close_time)
            .single()
            .unwrap_or_default()
    }
}

/// Bar span used when aggregating the base series; `minutes()` is the
/// aggregation factor relative to the 1-minute base resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
    ];

    /// Minutes per bar at this timeframe.
    pub fn minutes(self) -> usize {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::M1 => write!(f, "1m"),
            Timeframe::M5 => write!(f, "5m"),
            Timeframe::M15 => write!(f, "15m"),
            Timeframe::M30 => write!(f, "30m"),
            Timeframe::H1 => write!(f, "1h"),
            Timeframe::H4 => write!(f, "4h"),
        }
    }
}

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Outcome of a strategy evaluation for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Long,
    Short,
    Hold,
    Close,
}

/// A decision plus the strategy's stated reason and optional risk overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReason {
    pub decision: Decision,
    pub reason: String,
    /// Strategy-computed stop-loss price; overrides the trader's default
    /// max-loss stop when present.
    pub dynamic_stop_loss: Option<f64>,
    /// Explicit take-profit price; triggers a close once touched in the
    /// favorable direction.
    pub take_profit: Option<f64>,
}

impl DecisionReason {
    pub fn new(decision: Decision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
            dynamic_stop_loss: None,
            take_profit: None,
        }
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self::new(Decision::Hold, reason)
    }

    pub fn with_stops(mut self, stop_loss: Option<f64>, take_profit: Option<f64>) -> Self {
        self.dynamic_stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }
}

/// An open or closed position. Created by the position manager on a
/// LONG/SHORT decision, updated in place while open (stop ratchet, closing
/// data), finalized exactly once into the closed-deals list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub ticker: String,
    pub direction: Direction,
    pub opened_bar: Bar,
    pub closed_bar: Option<Bar>,
    pub stop_loss: f64,
    /// Position size in quote currency (USDT) at open.
    pub open_notional: f64,
    /// `open_notional` plus realized P&L; meaningful once closed.
    pub closed_notional: f64,
    pub close_message: Option<String>,
}

impl Deal {
    pub fn open(
        ticker: impl Into<String>,
        direction: Direction,
        opened_bar: Bar,
        open_notional: f64,
        stop_loss: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ticker: ticker.into(),
            direction,
            opened_bar,
            closed_bar: None,
            stop_loss,
            open_notional,
            closed_notional: 0.0,
            close_message: None,
        }
    }

    /// Reference price the position was entered at.
    pub fn entry_price(&self) -> f64 {
        self.opened_bar.close
    }

    pub fn is_win(&self) -> bool {
        self.closed_notional > self.open_notional
    }
}
