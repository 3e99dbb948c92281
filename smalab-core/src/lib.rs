//! SMA Lab core: a resumable, tick-driven evaluation of many SMA trading rules.
//!
//! This crate contains the simulation itself:
//! - Domain types (strategy, position, trading rules)
//! - The strategy pool and the day/tick clock
//! - The engine state machine and its seams: `PriceFeed`, `Ledger`, `StateStore`
//! - Market data providers and the frozen session snapshot
//! - Configuration and validation

pub mod clock;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod ledger;
pub mod pool;
pub mod state;

pub use clock::{ClockPosition, SimulationClock};
pub use config::{ConfigError, SimConfig};
pub use engine::{EngineError, EngineState, RunSummary, SimulationEngine, StepOutcome};
pub use ledger::{Ledger, LedgerError, MemoryLedger, TradeEvent, TradeKind};
pub use pool::{PoolError, StrategyPool};
pub use state::{MemoryStore, SessionState, StateStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: state that crosses the persistence boundary, and
    /// the providers, are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Strategy>();
        require_sync::<domain::Strategy>();
        require_send::<domain::StrategySnapshot>();
        require_sync::<domain::StrategySnapshot>();
        require_send::<domain::TradingRules>();
        require_sync::<domain::TradingRules>();
        require_send::<StrategyPool>();
        require_sync::<StrategyPool>();
        require_send::<SessionState>();
        require_sync::<SessionState>();
        require_send::<SimConfig>();
        require_sync::<SimConfig>();

        require_send::<data::MarketSnapshot>();
        require_sync::<data::MarketSnapshot>();
        require_send::<data::ReplayFeed>();
        require_sync::<data::ReplayFeed>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
    }
}
