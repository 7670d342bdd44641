use crate::value_objects::side::Side;
use serde::Serialize;

/// Record of an order being executed. Produced at most once per order:
/// fills are all-or-nothing, so `quantity` always equals the order quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub order_id: u64,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub fee: f64,
    pub slippage: f64,
    pub timestamp: i64,
}
