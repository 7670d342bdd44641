pub mod artifacts;
pub mod csv_market_data;
pub mod replay_feed;
