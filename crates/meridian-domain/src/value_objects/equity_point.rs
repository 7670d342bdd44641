use serde::Serialize;

/// One point of the equity curve: capital plus the signed market value of
/// all open positions at this timestamp. Exactly one per simulated tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub portfolio_value: f64,
    pub capital: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}
