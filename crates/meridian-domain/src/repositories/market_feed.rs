use crate::errors::FeedError;
use crate::value_objects::bar::Bar;
use std::time::Duration;

/// An open realtime subscription. Bars arrive in transport order; the
/// consumer owns pacing via `recv` timeouts.
pub trait MarketFeed {
    /// `Ok(Some(bar))` on data, `Ok(None)` when the timeout elapses with the
    /// feed still healthy, `Err` on disconnect or end of stream.
    fn recv(&mut self, timeout: Duration) -> Result<Option<Bar>, FeedError>;

    /// Releases the subscription. Idempotent.
    fn close(&mut self);
}

impl std::fmt::Debug for dyn MarketFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn MarketFeed")
    }
}

/// Port for opening realtime subscriptions.
pub trait MarketFeedProvider {
    fn subscribe(&self, symbols: &[String]) -> Result<Box<dyn MarketFeed>, FeedError>;
}
