use crate::value_objects::side::Side;
use serde::Serialize;

/// A closed round trip, emitted when a fill nets a position toward or
/// through zero. `side` is the direction of the closed exposure (Buy for a
/// long round trip). `fees` and `slippage` cover the whole round trip:
/// entry costs are apportioned pro-rata to the closed quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub fees: f64,
    pub slippage: f64,
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub holding_period_secs: i64,
    pub return_pct: f64,
}
