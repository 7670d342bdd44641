use serde::{Deserialize, Serialize};

/// One OHLCV snapshot for one symbol at one timestamp (epoch seconds).
/// Immutable once produced by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
