use crate::errors::DataFetchError;
use crate::value_objects::bar::Bar;
use crate::value_objects::timeframe::Timeframe;

/// Bounded historical request for one symbol. Timestamps are inclusive
/// unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OhlcvQuery {
    pub symbol: String,
    pub start: i64,
    pub end: i64,
    pub timeframe: Timeframe,
}

/// Port for historical market data. `Send + Sync` so independent symbols can
/// be fetched from parallel threads before the simulate phase starts.
pub trait MarketDataRepository: Send + Sync {
    fn fetch_historical(&self, query: &OhlcvQuery) -> Result<Vec<Bar>, DataFetchError>;
}
