use meridian_domain::errors::FeedError;
use meridian_domain::repositories::market_feed::{MarketFeed, MarketFeedProvider};
use meridian_domain::value_objects::bar::Bar;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Replays a pre-loaded bar history through the realtime path. A producer
/// thread pushes bars into a bounded channel at `pace` per bar; a full
/// channel stalls the producer instead of dropping or reordering bars. End
/// of history surfaces as a disconnect, which finalizes the run with
/// everything accumulated.
#[derive(Debug, Clone)]
pub struct ReplayFeedProvider {
    bars: Vec<Bar>,
    pace: Duration,
    queue_capacity: usize,
}

impl ReplayFeedProvider {
    pub fn new(mut bars: Vec<Bar>, pace: Duration, queue_capacity: usize) -> Self {
        bars.sort_by_key(|bar| bar.timestamp);
        Self {
            bars,
            pace,
            queue_capacity: queue_capacity.max(1),
        }
    }
}

impl MarketFeedProvider for ReplayFeedProvider {
    fn subscribe(&self, symbols: &[String]) -> Result<Box<dyn MarketFeed>, FeedError> {
        let selected: Vec<Bar> = self
            .bars
            .iter()
            .filter(|bar| symbols.contains(&bar.symbol))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(FeedError::Subscribe(format!(
                "no replay data for symbols {:?}",
                symbols
            )));
        }

        let (tx, rx): (SyncSender<Bar>, Receiver<Bar>) = mpsc::sync_channel(self.queue_capacity);
        let pace = self.pace;
        let count = selected.len();
        let handle = thread::spawn(move || {
            for bar in selected {
                // send blocks when the consumer lags; that is the backpressure
                if tx.send(bar).is_err() {
                    break;
                }
                if !pace.is_zero() {
                    thread::sleep(pace);
                }
            }
        });
        debug!(bars = count, "replay subscription opened");

        Ok(Box::new(ReplayFeed {
            receiver: Some(rx),
            producer: Some(handle),
        }))
    }
}

pub struct ReplayFeed {
    receiver: Option<Receiver<Bar>>,
    producer: Option<thread::JoinHandle<()>>,
}

impl MarketFeed for ReplayFeed {
    fn recv(&mut self, timeout: Duration) -> Result<Option<Bar>, FeedError> {
        let Some(receiver) = self.receiver.as_ref() else {
            return Err(FeedError::Disconnected("feed closed".to_string()));
        };
        match receiver.recv_timeout(timeout) {
            Ok(bar) => Ok(Some(bar)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(FeedError::Disconnected("replay complete".to_string()))
            }
        }
    }

    fn close(&mut self) {
        // dropping the receiver makes the producer's next send fail
        self.receiver.take();
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReplayFeed {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(symbol: &str, timestamp: i64, close: f64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn replays_bars_in_timestamp_order_then_disconnects() {
        let provider = ReplayFeedProvider::new(
            vec![bar("AAA", 120, 2.0), bar("AAA", 60, 1.0)],
            Duration::ZERO,
            4,
        );
        let mut feed = provider.subscribe(&["AAA".to_string()]).expect("subscribe");

        let first = feed.recv(Duration::from_secs(1)).unwrap().unwrap();
        let second = feed.recv(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(first.timestamp, 60);
        assert_eq!(second.timestamp, 120);
        assert!(matches!(
            feed.recv(Duration::from_secs(1)),
            Err(FeedError::Disconnected(_))
        ));
    }

    #[test]
    fn subscribe_fails_without_matching_symbols() {
        let provider = ReplayFeedProvider::new(vec![bar("AAA", 60, 1.0)], Duration::ZERO, 4);
        let err = provider.subscribe(&["BBB".to_string()]).unwrap_err();
        assert!(matches!(err, FeedError::Subscribe(_)));
    }

    #[test]
    fn recv_after_close_reports_disconnect() {
        let provider = ReplayFeedProvider::new(vec![bar("AAA", 60, 1.0)], Duration::ZERO, 4);
        let mut feed = provider.subscribe(&["AAA".to_string()]).expect("subscribe");
        feed.close();
        assert!(matches!(
            feed.recv(Duration::from_millis(10)),
            Err(FeedError::Disconnected(_))
        ));
    }
}
