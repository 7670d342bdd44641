use serde::Serialize;

/// Per-symbol exposure. `quantity` is signed: positive long, negative short.
/// `average_price` moves only when a fill extends the same-direction
/// exposure; reducing exposure realizes PnL instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub average_price: f64,
    pub realized_pnl: f64,
}
