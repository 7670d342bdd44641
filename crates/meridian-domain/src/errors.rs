use thiserror::Error;

/// Fatal for the current historical run: the engine cannot build a
/// deterministic timeline from a partially fetched history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataFetchError {
    #[error("transport failure for {symbol}: {message}")]
    Transport { symbol: String, message: String },
    #[error("could not parse market data for {symbol}: {message}")]
    Parse { symbol: String, message: String },
}

/// Rejects a single order at creation time; never aborts the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderValidationError {
    #[error("order quantity must be positive, got {0}")]
    NonPositiveQuantity(f64),
    #[error("limit order requires a limit price")]
    MissingLimitPrice,
    #[error("limit price must be positive, got {0}")]
    NonPositiveLimitPrice(f64),
    #[error("market order must not carry a limit price")]
    UnexpectedLimitPrice,
}

/// A strategy failure at one tick. Caught by the orchestrator, logged, and
/// that tick's order generation is skipped; accumulated state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("strategy error: {0}")]
pub struct StrategyError(pub String);

/// Realtime feed failures. `Disconnected` is unrecoverable and moves the run
/// to finalization with whatever was accumulated so far.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("feed disconnected: {0}")]
    Disconnected(String),
    #[error("feed subscription failed: {0}")]
    Subscribe(String),
}

/// Why a run terminated early. Attached to the `BacktestResult` instead of
/// being raised, so partial results stay inspectable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    DataFetch(#[from] DataFetchError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Artifact write-out failures (filesystem adapter, CSV/JSON encoding).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("artifact error: {0}")]
pub struct ArtifactError(pub String);
