pub mod bar;
pub mod equity_point;
pub mod fill;
pub mod order;
pub mod position;
pub mod side;
pub mod signal;
pub mod timeframe;
pub mod trade;
