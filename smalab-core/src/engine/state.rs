//! Engine states, step outcomes, run summary and errors.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::ConfigError;
use crate::data::FeedError;
use crate::ledger::LedgerError;
use crate::pool::{PoolError, TickSummary};
use crate::state::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Consuming intraday ticks.
    Running,
    /// Between days. Only observable if a rollover failed part way.
    DayBoundary,
    /// Every configured day processed; the session is terminal.
    Complete,
}

/// What one call to `step` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Tick { price: f64, summary: TickSummary },
    /// Unusable price; the tick was skipped.
    Malformed,
    /// A new day began.
    DayRolled { day: u32 },
    /// The session finished in this step.
    Completed { liquidated: usize },
    /// Nothing left to do.
    AlreadyComplete,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub malformed_ticks: u64,
    pub days_rolled: u32,
    pub buys: u64,
    pub sells: u64,
    pub liquidated: usize,
    /// Final cumulative profit per window.
    pub totals: BTreeMap<u32, f64>,
}

impl RunSummary {
    pub fn total_profit(&self) -> f64 {
        self.totals.values().sum()
    }

    /// Window with the highest cumulative profit.
    pub fn best_window(&self) -> Option<(u32, f64)> {
        self.totals
            .iter()
            .map(|(w, p)| (*w, *p))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("price feed failed: {0}")]
    Feed(#[from] FeedError),

    #[error("state store failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("engine stopped mid-rollover at day {day}; rebuild it from the store")]
    Interrupted { day: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_window_picks_highest_total() {
        let summary = RunSummary {
            totals: [(5, 1.0), (10, 3.5), (20, -2.0)].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(summary.best_window(), Some((10, 3.5)));
        assert!((summary.total_profit() - 2.5).abs() < 1e-12);
        assert_eq!(RunSummary::default().best_window(), None);
    }
}
