//! Ledger seam: the append-only record of trades and daily profit reports.
//!
//! The engine and pool only talk to the [`Ledger`] trait. The human-readable
//! evaluation log lives in the runner crate; [`MemoryLedger`] keeps entries in
//! memory for tests and benchmarks.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger write failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Buy,
    Sell,
    /// Forced close at series end.
    Liquidation,
}

/// A single buy, sell or liquidation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeEvent {
    pub window: u32,
    pub kind: TradeKind,
    pub price: f64,
    /// Realized profit. `None` for buys.
    pub profit: Option<f64>,
    /// The SMA mark the decision was made against.
    pub average: f64,
}

pub trait Ledger {
    /// A new simulated day begins.
    fn record_day_start(&mut self, day: u32) -> Result<(), LedgerError>;

    fn record_trade(&mut self, event: &TradeEvent) -> Result<(), LedgerError>;

    /// Periodic price sample at `tick` of the current day.
    fn record_price(&mut self, tick: u32, price: f64) -> Result<(), LedgerError>;

    /// End-of-day cumulative profit for one strategy.
    fn record_day_summary(&mut self, window: u32, cumulative_profit: f64)
        -> Result<(), LedgerError>;

    /// All configured days have been processed.
    fn record_completion(&mut self) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    DayStart(u32),
    Trade(TradeEvent),
    Price { tick: u32, price: f64 },
    DaySummary { window: u32, cumulative_profit: f64 },
    Completion,
}

/// In-memory ledger.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    entries: Vec<LedgerEntry>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn trades(&self) -> impl Iterator<Item = &TradeEvent> {
        self.entries.iter().filter_map(|e| match e {
            LedgerEntry::Trade(t) => Some(t),
            _ => None,
        })
    }

    /// Sum of realized profit recorded for one window.
    pub fn realized_profit(&self, window: u32) -> f64 {
        self.trades()
            .filter(|t| t.window == window)
            .filter_map(|t| t.profit)
            .sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Ledger for MemoryLedger {
    fn record_day_start(&mut self, day: u32) -> Result<(), LedgerError> {
        self.entries.push(LedgerEntry::DayStart(day));
        Ok(())
    }

    fn record_trade(&mut self, event: &TradeEvent) -> Result<(), LedgerError> {
        self.entries.push(LedgerEntry::Trade(*event));
        Ok(())
    }

    fn record_price(&mut self, tick: u32, price: f64) -> Result<(), LedgerError> {
        self.entries.push(LedgerEntry::Price { tick, price });
        Ok(())
    }

    fn record_day_summary(
        &mut self,
        window: u32,
        cumulative_profit: f64,
    ) -> Result<(), LedgerError> {
        self.entries.push(LedgerEntry::DaySummary {
            window,
            cumulative_profit,
        });
        Ok(())
    }

    fn record_completion(&mut self) -> Result<(), LedgerError> {
        self.entries.push(LedgerEntry::Completion);
        Ok(())
    }
}
