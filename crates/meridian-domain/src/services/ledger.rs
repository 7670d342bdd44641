use crate::value_objects::fill::Fill;
use crate::value_objects::position::Position;
use crate::value_objects::side::Side;
use crate::value_objects::trade::TradeRecord;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct PositionState {
    quantity: f64,
    average_price: f64,
    realized_pnl: f64,
    // Entry costs accumulated while the current exposure is open; released
    // pro-rata into trade records as quantity is closed.
    open_fees: f64,
    open_slippage: f64,
    opened_at: i64,
}

/// Per-symbol quantity/average-price/realized-PnL bookkeeping plus the
/// global capital balance. Capital moves by notional plus fees on every
/// fill; modeled slippage is a recorded cost and never touches capital, so
/// `capital == initial - sum(buy notional + fees) + sum(sell notional - fees)`
/// holds exactly at every step.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    capital: f64,
    initial_capital: f64,
    positions: HashMap<String, PositionState>,
}

impl PositionLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            initial_capital,
            positions: HashMap::new(),
        }
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.positions
            .get(symbol)
            .map(|state| to_position(symbol, state))
    }

    pub fn positions(&self) -> HashMap<String, Position> {
        self.positions
            .iter()
            .map(|(symbol, state)| (symbol.clone(), to_position(symbol, state)))
            .collect()
    }

    /// Open (nonzero) positions only, for mark-to-market walks.
    pub fn open_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions
            .iter()
            .filter(|(_, state)| state.quantity != 0.0)
            .map(|(symbol, state)| to_position(symbol, state))
    }

    pub fn realized_pnl(&self) -> f64 {
        self.positions.values().map(|state| state.realized_pnl).sum()
    }

    /// Unrealized PnL of one position at `current_price`. Read-only.
    pub fn mark_to_market(&self, symbol: &str, current_price: f64) -> f64 {
        match self.positions.get(symbol) {
            Some(state) if state.quantity != 0.0 => {
                (current_price - state.average_price) * state.quantity
            }
            _ => 0.0,
        }
    }

    /// Applies a fill: updates capital, recomputes or reduces the position,
    /// and emits a `TradeRecord` iff the fill nets exposure toward or
    /// through zero. A sign-flipping fill is split deterministically:
    /// closed portion first, then a fresh position for the excess.
    pub fn apply_fill(&mut self, fill: &Fill) -> (Position, Option<TradeRecord>) {
        let notional = fill.quantity * fill.price;
        match fill.side {
            Side::Buy => self.capital -= notional + fill.fee,
            Side::Sell => self.capital += notional - fill.fee,
        }

        let signed_quantity = fill.quantity * fill.side.sign();
        let state = self.positions.entry(fill.symbol.clone()).or_default();

        let extends = state.quantity == 0.0 || state.quantity.signum() == signed_quantity.signum();
        let trade = if extends {
            extend(state, fill, signed_quantity);
            None
        } else {
            Some(reduce(state, fill))
        };

        (to_position(&fill.symbol, state), trade)
    }
}

fn extend(state: &mut PositionState, fill: &Fill, signed_quantity: f64) {
    if state.quantity == 0.0 {
        state.average_price = fill.price;
        state.opened_at = fill.timestamp;
        state.open_fees = fill.fee;
        state.open_slippage = fill.slippage;
    } else {
        let prior = state.quantity.abs();
        let total = prior + fill.quantity;
        state.average_price =
            (state.average_price * prior + fill.price * fill.quantity) / total;
        state.open_fees += fill.fee;
        state.open_slippage += fill.slippage;
    }
    state.quantity += signed_quantity;
}

fn reduce(state: &mut PositionState, fill: &Fill) -> TradeRecord {
    let direction = state.quantity.signum();
    let held = state.quantity.abs();
    let closed = fill.quantity.min(held);
    let leftover = fill.quantity - closed;

    let close_share = closed / held;
    let entry_fees = state.open_fees * close_share;
    let entry_slippage = state.open_slippage * close_share;
    let exit_share = closed / fill.quantity;
    let exit_fees = fill.fee * exit_share;
    let exit_slippage = fill.slippage * exit_share;

    let fees = entry_fees + exit_fees;
    let slippage = entry_slippage + exit_slippage;
    let gross = (fill.price - state.average_price) * closed * direction;
    let pnl = gross - fees - slippage;

    let cost_basis = state.average_price * closed;
    let trade = TradeRecord {
        symbol: fill.symbol.clone(),
        side: if direction > 0.0 { Side::Buy } else { Side::Sell },
        entry_price: state.average_price,
        exit_price: fill.price,
        quantity: closed,
        pnl,
        fees,
        slippage,
        entry_timestamp: state.opened_at,
        exit_timestamp: fill.timestamp,
        holding_period_secs: fill.timestamp - state.opened_at,
        return_pct: if cost_basis != 0.0 { pnl / cost_basis } else { 0.0 },
    };

    state.realized_pnl += pnl;

    if leftover > 0.0 {
        // Reversal: the closed side is done, the excess opens the other way.
        state.quantity = -direction * leftover;
        state.average_price = fill.price;
        state.opened_at = fill.timestamp;
        state.open_fees = fill.fee - exit_fees;
        state.open_slippage = fill.slippage - exit_slippage;
    } else if closed == held {
        state.quantity = 0.0;
        state.average_price = 0.0;
        state.open_fees = 0.0;
        state.open_slippage = 0.0;
    } else {
        state.quantity = direction * (held - closed);
        state.open_fees -= entry_fees;
        state.open_slippage -= entry_slippage;
    }

    trade
}

fn to_position(symbol: &str, state: &PositionState) -> Position {
    Position {
        symbol: symbol.to_string(),
        quantity: state.quantity,
        average_price: state.average_price,
        realized_pnl: state.realized_pnl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(side: Side, quantity: f64, price: f64, fee: f64, timestamp: i64) -> Fill {
        Fill {
            order_id: 0,
            symbol: "BTC-USDT".to_string(),
            side,
            quantity,
            price,
            fee,
            slippage: 0.0,
            timestamp,
        }
    }

    #[test]
    fn round_trip_realizes_pnl_net_of_both_fees() {
        // initial 100_000, commission 0.1%: buy 1 @ 50_000 (fee 50),
        // sell 1 @ 51_000 (fee 51) => pnl 899, capital 100_899.
        let mut ledger = PositionLedger::new(100_000.0);

        let (position, trade) = ledger.apply_fill(&fill(Side::Buy, 1.0, 50_000.0, 50.0, 100));
        assert!(trade.is_none());
        assert_eq!(position.quantity, 1.0);
        assert_eq!(position.average_price, 50_000.0);
        assert!((ledger.capital() - 49_950.0).abs() < 1e-9);

        let (position, trade) = ledger.apply_fill(&fill(Side::Sell, 1.0, 51_000.0, 51.0, 160));
        let trade = trade.expect("closing fill emits a trade");
        assert_eq!(position.quantity, 0.0);
        assert_eq!(trade.quantity, 1.0);
        assert!((trade.pnl - 899.0).abs() < 1e-9);
        assert!((trade.fees - 101.0).abs() < 1e-9);
        assert_eq!(trade.holding_period_secs, 60);
        assert!((ledger.capital() - 100_899.0).abs() < 1e-9);
        assert!((ledger.realized_pnl() - 899.0).abs() < 1e-9);
    }

    #[test]
    fn extending_exposure_recomputes_weighted_average_price() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.apply_fill(&fill(Side::Buy, 1.0, 100.0, 0.0, 1));
        let (position, trade) = ledger.apply_fill(&fill(Side::Buy, 3.0, 120.0, 0.0, 2));
        assert!(trade.is_none());
        assert_eq!(position.quantity, 4.0);
        assert!((position.average_price - 115.0).abs() < 1e-9);
    }

    #[test]
    fn partial_close_keeps_average_price_and_releases_entry_fees_pro_rata() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.apply_fill(&fill(Side::Buy, 4.0, 100.0, 8.0, 1));
        let (position, trade) = ledger.apply_fill(&fill(Side::Sell, 1.0, 110.0, 1.0, 2));

        let trade = trade.unwrap();
        assert_eq!(position.quantity, 3.0);
        assert_eq!(position.average_price, 100.0);
        // entry fee share 8 * 1/4 = 2, exit fee 1
        assert!((trade.fees - 3.0).abs() < 1e-9);
        assert!((trade.pnl - 7.0).abs() < 1e-9);
    }

    #[test]
    fn reversal_splits_into_close_then_fresh_opposite_position() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.apply_fill(&fill(Side::Buy, 2.0, 100.0, 0.0, 1));
        let (position, trade) = ledger.apply_fill(&fill(Side::Sell, 5.0, 110.0, 0.0, 2));

        let trade = trade.unwrap();
        assert_eq!(trade.quantity, 2.0);
        assert!((trade.pnl - 20.0).abs() < 1e-9);
        assert_eq!(position.quantity, -3.0);
        assert_eq!(position.average_price, 110.0);
    }

    #[test]
    fn short_round_trip_realizes_gain_when_price_falls() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.apply_fill(&fill(Side::Sell, 2.0, 100.0, 0.0, 1));
        assert!((ledger.capital() - 10_200.0).abs() < 1e-9);
        assert!((ledger.mark_to_market("BTC-USDT", 90.0) - 20.0).abs() < 1e-9);

        let (position, trade) = ledger.apply_fill(&fill(Side::Buy, 2.0, 90.0, 0.0, 2));
        let trade = trade.unwrap();
        assert_eq!(position.quantity, 0.0);
        assert_eq!(trade.side, Side::Sell);
        assert!((trade.pnl - 20.0).abs() < 1e-9);
        assert!((ledger.capital() - 10_020.0).abs() < 1e-9);
    }

    #[test]
    fn capital_moves_by_notional_plus_fees_regardless_of_realization() {
        let mut ledger = PositionLedger::new(1_000.0);
        ledger.apply_fill(&fill(Side::Buy, 2.0, 100.0, 2.0, 1));
        ledger.apply_fill(&fill(Side::Sell, 1.0, 105.0, 1.0, 2));
        // 1000 - (200 + 2) + (105 - 1)
        assert!((ledger.capital() - 902.0).abs() < 1e-9);
    }

    #[test]
    fn mark_to_market_never_mutates_state() {
        let mut ledger = PositionLedger::new(1_000.0);
        ledger.apply_fill(&fill(Side::Buy, 1.0, 100.0, 0.0, 1));
        let before = ledger.position("BTC-USDT").unwrap();
        let _ = ledger.mark_to_market("BTC-USDT", 500.0);
        assert_eq!(ledger.position("BTC-USDT").unwrap(), before);
    }
}
