use crate::errors::StrategyError;
use crate::services::feed::SnapshotSet;
use crate::value_objects::signal::Signal;

/// The external decision-maker. Implementations see exactly one aligned
/// snapshot per tick and never any later data.
pub trait Strategy {
    fn name(&self) -> &str;

    /// Signals for this tick. An `Err` skips order generation for the tick
    /// and the run continues.
    fn analyze(&mut self, snapshot: &SnapshotSet<'_>) -> Result<Vec<Signal>, StrategyError>;

    /// Quantity for a signal given the capital currently available. Returns
    /// 0.0 when no safe size exists; it must not error.
    fn size_position(&self, signal: &Signal, available_capital: f64) -> f64;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn analyze(&mut self, snapshot: &SnapshotSet<'_>) -> Result<Vec<Signal>, StrategyError> {
        (**self).analyze(snapshot)
    }

    fn size_position(&self, signal: &Signal, available_capital: f64) -> f64 {
        (**self).size_position(signal, available_capital)
    }
}

/// Inert strategy for smoke runs and plumbing tests. Emits no signals.
#[derive(Debug, Default, Clone)]
pub struct HoldStrategy;

impl Strategy for HoldStrategy {
    fn name(&self) -> &str {
        "hold"
    }

    fn analyze(&mut self, _snapshot: &SnapshotSet<'_>) -> Result<Vec<Signal>, StrategyError> {
        Ok(Vec::new())
    }

    fn size_position(&self, _signal: &Signal, _available_capital: f64) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn hold_strategy_never_signals() {
        let fresh = HashMap::new();
        let latest = HashMap::new();
        let snapshot = SnapshotSet::new(0, &fresh, &latest);
        let mut strategy = HoldStrategy;
        assert!(strategy.analyze(&snapshot).unwrap().is_empty());
    }
}
