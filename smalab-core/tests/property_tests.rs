//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Determinism: the same script gives the same totals
//! 2. Resumability: stopping after any step and rebuilding from the store
//!    gives the same totals as an uninterrupted run
//! 3. Profit conservation: totals equal the realized profit in the ledger
//! 4. Exclusivity: at most one trade per strategy per tick, and buys and
//!    sells alternate

mod common;

use common::*;
use proptest::prelude::*;
use smalab_core::domain::TradeMode;
use smalab_core::ledger::{LedgerEntry, MemoryLedger, TradeKind};
use smalab_core::state::StateStore;
use smalab_core::SimulationEngine;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (90.0..110.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_days() -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(arb_price(), 1..12), 1..5)
}

fn arb_mode() -> impl Strategy<Value = TradeMode> {
    prop_oneof![Just(TradeMode::Momentum), Just(TradeMode::MeanReversion)]
}

fn feed_for(days: Vec<Vec<f64>>) -> ScriptedFeed {
    let averages = (0..days.len()).map(|d| 99.0 + d as f64 * 0.5).collect();
    ScriptedFeed::from_prices(days, averages).with_spread(0.1)
}

// ── 1. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn identical_inputs_give_identical_totals(days in arb_days(), mode in arb_mode()) {
        let config = config(1, 10, mode);
        let a = engine(&config, feed_for(days.clone())).run().unwrap();
        let b = engine(&config, feed_for(days)).run().unwrap();
        prop_assert_eq!(a, b);
    }
}

// ── 2. Resumability ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn resume_after_k_steps_matches(
        days in arb_days(),
        mode in arb_mode(),
        k in 0usize..40,
    ) {
        let config = config(1, 8, mode);
        let expected = engine(&config, feed_for(days.clone())).run().unwrap().totals;

        let mut first = engine(&config, feed_for(days.clone()));
        for _ in 0..k {
            if first.is_complete() {
                break;
            }
            first.step().unwrap();
        }
        let (_, _, store) = first.into_parts();

        let mut resumed =
            SimulationEngine::new(config, feed_for(days), MemoryLedger::new(), store).unwrap();
        resumed.run().unwrap();
        let (_, _, store) = resumed.into_parts();
        let totals = store.load().unwrap().totals;

        prop_assert_eq!(totals.len(), expected.len());
        for (window, total) in &expected {
            prop_assert!(approx(totals[window], *total));
        }
    }
}

// ── 3. Profit conservation ───────────────────────────────────────────

proptest! {
    #[test]
    fn totals_equal_realized_ledger_profit(days in arb_days(), mode in arb_mode()) {
        let config = config(1, 10, mode);
        let mut engine = engine(&config, feed_for(days));
        let summary = engine.run().unwrap();

        for (window, total) in &summary.totals {
            let realized = engine.ledger().realized_profit(*window);
            prop_assert!(approx(realized, *total));
        }
    }

    #[test]
    fn malformed_ticks_do_not_move_totals(days in arb_days(), mode in arb_mode()) {
        let config = config(1, 6, mode);
        let clean = engine(&config, feed_for(days.clone())).run().unwrap().totals;

        let mut noisy = feed_for(days);
        for day in &mut noisy.days {
            day.insert(0, "garbage".into());
            day.push(String::new());
        }
        let dirty = engine(&config, noisy).run().unwrap().totals;
        prop_assert_eq!(clean, dirty);
    }
}

// ── 4. Exclusivity ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn buys_and_sells_alternate(days in arb_days(), mode in arb_mode()) {
        let config = config(1, 10, mode);
        let mut engine = engine(&config, feed_for(days));
        engine.run().unwrap();

        for window in 1..=10u32 {
            let kinds: Vec<TradeKind> = engine
                .ledger()
                .trades()
                .filter(|t| t.window == window)
                .map(|t| t.kind)
                .collect();
            for pair in kinds.windows(2) {
                let alternates = matches!(
                    pair,
                    [TradeKind::Buy, TradeKind::Sell | TradeKind::Liquidation]
                        | [TradeKind::Sell, TradeKind::Buy]
                );
                prop_assert!(alternates, "window {} saw {:?}", window, pair);
            }
            if let Some(first) = kinds.first() {
                prop_assert_eq!(*first, TradeKind::Buy);
            }
        }
    }

    #[test]
    fn every_strategy_is_flat_at_the_end(days in arb_days(), mode in arb_mode()) {
        let config = config(1, 10, mode);
        let mut engine = engine(&config, feed_for(days));
        engine.run().unwrap();

        prop_assert_eq!(engine.pool().holding_count(), 0);
        let completions = engine
            .ledger()
            .entries()
            .iter()
            .filter(|e| matches!(e, LedgerEntry::Completion))
            .count();
        prop_assert_eq!(completions, 1);
    }
}
