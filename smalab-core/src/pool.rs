//! The population of SMA strategies, one per configured window length.
//!
//! Strategies are independent. The pool only guarantees a fixed iteration
//! order (increasing window) so ledgers are reproducible, and that a day
//! rollover finishes for every strategy before the next tick is applied.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::SimConfig;
use crate::domain::{Strategy, StrategySnapshot, TradeAction, TradingRules};
use crate::ledger::{Ledger, LedgerError};
use crate::state::SessionState;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("expected {expected} averages (one per window), got {got}")]
    AverageCountMismatch { expected: usize, got: usize },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Trades triggered by one tick across the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub buys: usize,
    pub sells: usize,
}

#[derive(Debug, Clone)]
pub struct StrategyPool {
    strategies: Vec<Strategy>,
    rules: TradingRules,
}

impl StrategyPool {
    /// Build a pool from window lengths. Duplicates are dropped and the
    /// remainder sorted ascending.
    pub fn new(windows: &[u32], rules: TradingRules) -> Self {
        let mut windows = windows.to_vec();
        windows.sort_unstable();
        windows.dedup();
        Self {
            strategies: windows.into_iter().map(Strategy::new).collect(),
            rules,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(&config.windows.windows(), config.trading)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn rules(&self) -> &TradingRules {
        &self.rules
    }

    pub fn windows(&self) -> Vec<u32> {
        self.strategies.iter().map(Strategy::window).collect()
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn get(&self, window: u32) -> Option<&Strategy> {
        self.strategies
            .binary_search_by_key(&window, Strategy::window)
            .ok()
            .map(|i| &self.strategies[i])
    }

    /// Seed profits from the totals map (zero when absent) and restore any
    /// per-strategy snapshot, then refresh every average for the current day.
    pub fn initialize_from_store(
        &mut self,
        state: &SessionState,
        averages: &[f64],
    ) -> Result<(), PoolError> {
        self.check_averages(averages)?;
        self.restore(state);
        for (strategy, avg) in self.strategies.iter_mut().zip(averages) {
            strategy.refresh_average(*avg);
        }
        Ok(())
    }

    /// Restore profits and positions without touching averages.
    pub fn restore(&mut self, state: &SessionState) {
        for strategy in &mut self.strategies {
            let window = strategy.window();
            strategy.seed_profit(state.totals.get(&window).copied().unwrap_or(0.0));
            if let Some(snapshot) = state.snapshot_for(window) {
                strategy.restore(snapshot);
            }
        }
    }

    /// Forward one price to every strategy, in increasing window order.
    pub fn apply_tick(
        &mut self,
        price: f64,
        ledger: &mut dyn Ledger,
    ) -> Result<TickSummary, PoolError> {
        let mut summary = TickSummary::default();
        for strategy in &mut self.strategies {
            match strategy.apply_tick(price, &self.rules, ledger)? {
                TradeAction::Buy => summary.buys += 1,
                TradeAction::Sell => summary.sells += 1,
                TradeAction::Hold => {}
            }
        }
        Ok(summary)
    }

    /// End-of-day bookkeeping: report profit, count down cooldown, then take
    /// the new day's average. Averages are checked up front so a mismatch
    /// leaves every strategy untouched.
    pub fn apply_day_rollover(
        &mut self,
        new_averages: &[f64],
        ledger: &mut dyn Ledger,
    ) -> Result<(), PoolError> {
        self.check_averages(new_averages)?;
        for (strategy, avg) in self.strategies.iter_mut().zip(new_averages) {
            ledger.record_day_summary(strategy.window(), strategy.cumulative_profit())?;
            strategy.tick_downtime();
            strategy.refresh_average(*avg);
        }
        Ok(())
    }

    /// Close every open position at `last_price` and report final profits.
    ///
    /// Without a price nothing can be liquidated; open positions are logged
    /// and left as they are. Returns how many positions were closed.
    pub fn finalize(
        &mut self,
        last_price: Option<f64>,
        ledger: &mut dyn Ledger,
    ) -> Result<usize, PoolError> {
        let mut closed = 0;
        match last_price.filter(|p| p.is_finite()) {
            Some(price) => {
                for strategy in &mut self.strategies {
                    if strategy.force_liquidate(price, &self.rules, ledger)? {
                        closed += 1;
                    }
                }
            }
            None => {
                let open = self.holding_count();
                if open > 0 {
                    tracing::warn!(open, "no price observed, open positions left unliquidated");
                }
            }
        }

        for strategy in &self.strategies {
            ledger.record_day_summary(strategy.window(), strategy.cumulative_profit())?;
        }
        Ok(closed)
    }

    pub fn holding_count(&self) -> usize {
        self.strategies
            .iter()
            .filter(|s| s.position().is_holding())
            .count()
    }

    pub fn totals(&self) -> BTreeMap<u32, f64> {
        self.strategies
            .iter()
            .map(|s| (s.window(), s.cumulative_profit()))
            .collect()
    }

    pub fn snapshots(&self) -> Vec<StrategySnapshot> {
        self.strategies.iter().map(Strategy::snapshot).collect()
    }

    fn check_averages(&self, averages: &[f64]) -> Result<(), PoolError> {
        if averages.len() != self.strategies.len() {
            return Err(PoolError::AverageCountMismatch {
                expected: self.strategies.len(),
                got: averages.len(),
            });
        }
        Ok(())
    }
}
