//! A single SMA-window trading rule.
//!
//! Each strategy is a two-state machine (flat / holding) with a cooldown
//! counter that blocks re-entry for a number of day rollovers after a sell.
//! Strategies never share state: everything below is owned per instance and
//! initialized in [`Strategy::new`].

use serde::{Deserialize, Serialize};

use crate::domain::position::Position;
use crate::domain::rules::TradingRules;
use crate::ledger::{Ledger, LedgerError, TradeEvent, TradeKind};

/// What a strategy did with one price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Hold,
    Buy,
    Sell,
}

/// Persisted form of a strategy, enough to resume mid-position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub window: u32,
    pub position: Position,
    pub cumulative_profit: f64,
    pub cooldown_days: u32,
    /// `None` while no valid average has been seen (JSON has no NaN).
    pub current_average: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Strategy {
    window: u32,
    position: Position,
    cumulative_profit: f64,
    cooldown_days: u32,
    current_average: f64,
}

impl Strategy {
    pub fn new(window: u32) -> Self {
        Self {
            window,
            position: Position::Flat,
            cumulative_profit: 0.0,
            cooldown_days: 0,
            current_average: f64::NAN,
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn cumulative_profit(&self) -> f64 {
        self.cumulative_profit
    }

    pub fn cooldown_days(&self) -> u32 {
        self.cooldown_days
    }

    pub fn current_average(&self) -> f64 {
        self.current_average
    }

    /// Seed the profit accumulator from a persisted totals snapshot.
    pub fn seed_profit(&mut self, profit: f64) {
        self.cumulative_profit = profit;
    }

    /// Restore position, cooldown and average from a snapshot of the same window.
    ///
    /// Profit is left alone: it is seeded from the totals map.
    pub fn restore(&mut self, snapshot: &StrategySnapshot) {
        debug_assert_eq!(snapshot.window, self.window);
        self.position = snapshot.position;
        self.cooldown_days = snapshot.cooldown_days;
        if let Some(avg) = snapshot.current_average {
            self.current_average = avg;
        }
    }

    pub fn snapshot(&self) -> StrategySnapshot {
        StrategySnapshot {
            window: self.window,
            position: self.position,
            cumulative_profit: self.cumulative_profit,
            cooldown_days: self.cooldown_days,
            current_average: self
                .current_average
                .is_finite()
                .then_some(self.current_average),
        }
    }

    /// Replace the SMA mark. A non-finite value keeps the previous mark.
    ///
    /// Returns whether the new value was applied.
    pub fn refresh_average(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            tracing::warn!(
                window = self.window,
                value,
                retained = self.current_average,
                "invalid moving average, keeping previous mark"
            );
            return false;
        }
        self.current_average = value;
        true
    }

    /// Count one day off the cooldown.
    pub fn tick_downtime(&mut self) {
        if self.cooldown_days > 0 {
            self.cooldown_days -= 1;
        }
    }

    /// Buy/sell/hold decision for one intraday price.
    ///
    /// Emits exactly one ledger event per transition. Holding is silent.
    pub fn apply_tick(
        &mut self,
        price: f64,
        rules: &TradingRules,
        ledger: &mut dyn Ledger,
    ) -> Result<TradeAction, LedgerError> {
        if !price.is_finite() {
            return Ok(TradeAction::Hold);
        }

        match self.position {
            Position::Flat => {
                if self.cooldown_days == 0
                    && rules
                        .mode
                        .should_buy(price, self.current_average, rules.buy_threshold)
                {
                    self.position = Position::Holding { entry_price: price };
                    ledger.record_trade(&TradeEvent {
                        window: self.window,
                        kind: TradeKind::Buy,
                        price,
                        profit: None,
                        average: self.current_average,
                    })?;
                    return Ok(TradeAction::Buy);
                }
            }
            Position::Holding { entry_price } => {
                if rules
                    .mode
                    .should_sell(price, self.current_average, rules.sell_threshold)
                {
                    let profit = (price - entry_price) - rules.fee;
                    self.position = Position::Flat;
                    self.cumulative_profit += profit;
                    self.cooldown_days += rules.downtime_days;
                    ledger.record_trade(&TradeEvent {
                        window: self.window,
                        kind: TradeKind::Sell,
                        price,
                        profit: Some(profit),
                        average: self.current_average,
                    })?;
                    return Ok(TradeAction::Sell);
                }
            }
        }

        Ok(TradeAction::Hold)
    }

    /// Close an open position at `price` regardless of the average.
    ///
    /// Only used at series end. Returns whether a position was closed.
    pub fn force_liquidate(
        &mut self,
        price: f64,
        rules: &TradingRules,
        ledger: &mut dyn Ledger,
    ) -> Result<bool, LedgerError> {
        let Some(profit) = self.position.realized_pnl(price, rules.fee) else {
            return Ok(false);
        };
        self.position = Position::Flat;
        self.cumulative_profit += profit;
        ledger.record_trade(&TradeEvent {
            window: self.window,
            kind: TradeKind::Liquidation,
            price,
            profit: Some(profit),
            average: self.current_average,
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::TradeMode;
    use crate::ledger::{LedgerEntry, MemoryLedger};

    fn rules(mode: TradeMode) -> TradingRules {
        TradingRules {
            mode,
            buy_threshold: 1.0,
            sell_threshold: 1.0,
            fee: 0.1,
            downtime_days: 2,
        }
    }

    fn strategy_at(avg: f64) -> Strategy {
        let mut s = Strategy::new(5);
        assert!(s.refresh_average(avg));
        s
    }

    #[test]
    fn new_strategy_is_flat_with_no_average() {
        let s = Strategy::new(7);
        assert_eq!(s.window(), 7);
        assert!(s.position().is_flat());
        assert_eq!(s.cumulative_profit(), 0.0);
        assert_eq!(s.cooldown_days(), 0);
        assert!(s.current_average().is_nan());
    }

    #[test]
    fn instances_do_not_share_state() {
        let r = rules(TradeMode::MeanReversion);
        let mut ledger = MemoryLedger::new();
        let mut a = strategy_at(100.0);
        let b = strategy_at(100.0);
        a.apply_tick(97.0, &r, &mut ledger).unwrap();
        assert!(a.position().is_holding());
        assert!(b.position().is_flat());
    }

    #[test]
    fn nan_average_is_ignored() {
        let mut s = strategy_at(100.0);
        assert!(!s.refresh_average(f64::NAN));
        assert_eq!(s.current_average(), 100.0);
    }

    #[test]
    fn mean_reversion_round_trip() {
        // Average 100, thresholds 1: 99.5 holds, 97 buys, 99/101 hold, 102 sells.
        let r = rules(TradeMode::MeanReversion);
        let mut ledger = MemoryLedger::new();
        let mut s = strategy_at(100.0);

        let actions: Vec<_> = [99.5, 97.0, 99.0, 101.0, 102.0]
            .iter()
            .map(|p| s.apply_tick(*p, &r, &mut ledger).unwrap())
            .collect();

        assert_eq!(
            actions,
            vec![
                TradeAction::Hold,
                TradeAction::Buy,
                TradeAction::Hold,
                TradeAction::Hold,
                TradeAction::Sell
            ]
        );
        assert!((s.cumulative_profit() - 4.9).abs() < 1e-9);
        assert_eq!(s.cooldown_days(), 2);
        assert!(s.position().is_flat());
        assert_eq!(ledger.entries().len(), 2);
    }

    #[test]
    fn first_qualifying_tick_buys() {
        // 98 + 1 < 100 already qualifies.
        let r = rules(TradeMode::MeanReversion);
        let mut ledger = MemoryLedger::new();
        let mut s = strategy_at(100.0);
        for p in [98.0, 97.0, 99.0, 101.0, 102.0] {
            s.apply_tick(p, &r, &mut ledger).unwrap();
        }
        assert!((s.cumulative_profit() - 3.9).abs() < 1e-9);
    }

    #[test]
    fn cooldown_blocks_buys_until_it_expires() {
        let r = rules(TradeMode::MeanReversion);
        let mut ledger = MemoryLedger::new();
        let mut s = strategy_at(100.0);
        s.apply_tick(97.0, &r, &mut ledger).unwrap();
        s.apply_tick(102.0, &r, &mut ledger).unwrap();
        assert_eq!(s.cooldown_days(), 2);

        assert_eq!(s.apply_tick(90.0, &r, &mut ledger).unwrap(), TradeAction::Hold);
        s.tick_downtime();
        assert_eq!(s.apply_tick(90.0, &r, &mut ledger).unwrap(), TradeAction::Hold);
        s.tick_downtime();
        assert_eq!(s.cooldown_days(), 0);
        assert_eq!(s.apply_tick(90.0, &r, &mut ledger).unwrap(), TradeAction::Buy);
    }

    #[test]
    fn tick_downtime_saturates_at_zero() {
        let mut s = Strategy::new(3);
        s.tick_downtime();
        assert_eq!(s.cooldown_days(), 0);
    }

    #[test]
    fn momentum_round_trip() {
        let r = rules(TradeMode::Momentum);
        let mut ledger = MemoryLedger::new();
        let mut s = strategy_at(100.0);
        assert_eq!(s.apply_tick(102.0, &r, &mut ledger).unwrap(), TradeAction::Buy);
        assert_eq!(s.apply_tick(98.0, &r, &mut ledger).unwrap(), TradeAction::Sell);
        assert!((s.cumulative_profit() - (-4.1)).abs() < 1e-9);
    }

    #[test]
    fn non_finite_price_is_a_hold() {
        let r = rules(TradeMode::MeanReversion);
        let mut ledger = MemoryLedger::new();
        let mut s = strategy_at(100.0);
        assert_eq!(s.apply_tick(f64::NAN, &r, &mut ledger).unwrap(), TradeAction::Hold);
        assert_eq!(
            s.apply_tick(f64::NEG_INFINITY, &r, &mut ledger).unwrap(),
            TradeAction::Hold
        );
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn force_liquidate_closes_open_position_only() {
        let r = rules(TradeMode::MeanReversion);
        let mut ledger = MemoryLedger::new();
        let mut s = strategy_at(100.0);
        assert!(!s.force_liquidate(95.0, &r, &mut ledger).unwrap());

        s.apply_tick(97.0, &r, &mut ledger).unwrap();
        assert!(s.force_liquidate(98.0, &r, &mut ledger).unwrap());
        assert!(s.position().is_flat());
        assert!((s.cumulative_profit() - 0.9).abs() < 1e-9);
        assert!(matches!(
            ledger.entries().last(),
            Some(LedgerEntry::Trade(TradeEvent { kind: TradeKind::Liquidation, .. }))
        ));
    }

    #[test]
    fn snapshot_restore_preserves_position_and_cooldown() {
        let r = rules(TradeMode::MeanReversion);
        let mut ledger = MemoryLedger::new();
        let mut s = strategy_at(100.0);
        s.apply_tick(97.0, &r, &mut ledger).unwrap();

        let snap = s.snapshot();
        let mut restored = Strategy::new(5);
        restored.seed_profit(snap.cumulative_profit);
        restored.restore(&snap);

        assert_eq!(restored.position(), Position::Holding { entry_price: 97.0 });
        assert_eq!(restored.current_average(), 100.0);
        assert_eq!(restored.snapshot(), snap);
    }

    #[test]
    fn snapshot_maps_nan_average_to_none() {
        let s = Strategy::new(4);
        assert_eq!(s.snapshot().current_average, None);
    }
}
