pub mod manager;

pub use manager::{Performance, Settlement, Trader, TraderConfig};
