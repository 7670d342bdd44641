use meridian_domain::services::ledger::PositionLedger;
use meridian_domain::value_objects::fill::Fill;
use meridian_domain::value_objects::side::Side;
use proptest::prelude::*;

fn fill(side: Side, quantity: f64, price: f64, fee: f64, timestamp: i64) -> Fill {
    Fill {
        order_id: 0,
        symbol: "SYM".to_string(),
        side,
        quantity,
        price,
        fee,
        slippage: 0.0,
        timestamp,
    }
}

fn arbitrary_fill() -> impl Strategy<Value = (Side, f64, f64, f64)> {
    (
        prop_oneof![Just(Side::Buy), Just(Side::Sell)],
        0.01..10.0f64,
        1.0..10_000.0f64,
        0.0..50.0f64,
    )
}

proptest! {
    // capital always equals initial minus buy flows plus sell flows
    #[test]
    fn capital_is_conserved_over_any_fill_sequence(
        fills in prop::collection::vec(arbitrary_fill(), 0..40)
    ) {
        let initial = 1_000_000.0;
        let mut ledger = PositionLedger::new(initial);
        let mut expected = initial;

        for (step, (side, quantity, price, fee)) in fills.iter().enumerate() {
            ledger.apply_fill(&fill(*side, *quantity, *price, *fee, step as i64));
            let notional = quantity * price;
            match side {
                Side::Buy => expected -= notional + fee,
                Side::Sell => expected += notional - fee,
            }
        }

        prop_assert!((ledger.capital() - expected).abs() < 1e-6);
    }

    #[test]
    fn round_trip_returns_to_flat_with_exactly_one_trade(
        quantity in 0.01..100.0f64,
        entry_price in 1.0..50_000.0f64,
        exit_price in 1.0..50_000.0f64,
        long in any::<bool>(),
    ) {
        let (open_side, close_side) = if long {
            (Side::Buy, Side::Sell)
        } else {
            (Side::Sell, Side::Buy)
        };

        let mut ledger = PositionLedger::new(1_000_000.0);
        let (_, opened) = ledger.apply_fill(&fill(open_side, quantity, entry_price, 0.0, 1));
        let (position, closed) = ledger.apply_fill(&fill(close_side, quantity, exit_price, 0.0, 2));

        prop_assert!(opened.is_none());
        prop_assert_eq!(position.quantity, 0.0);
        let trade = closed.expect("closing fill must produce a trade");
        prop_assert!((trade.quantity - quantity).abs() < 1e-12);
    }

    #[test]
    fn realized_pnl_matches_capital_delta_when_fees_are_zero(
        quantity in 0.01..100.0f64,
        entry_price in 1.0..50_000.0f64,
        exit_price in 1.0..50_000.0f64,
    ) {
        let initial = 10_000_000.0;
        let mut ledger = PositionLedger::new(initial);
        ledger.apply_fill(&fill(Side::Buy, quantity, entry_price, 0.0, 1));
        ledger.apply_fill(&fill(Side::Sell, quantity, exit_price, 0.0, 2));

        let delta = ledger.capital() - initial;
        prop_assert!((ledger.realized_pnl() - delta).abs() < 1e-6);
    }
}
