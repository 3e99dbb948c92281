//! The resumable day/tick simulation loop.
//!
//! Each [`SimulationEngine::step`] performs one transition:
//!
//! - `Running -> Running`: a price is applied to every strategy.
//! - `Running -> DayBoundary -> Running`: the day ends, the next day's
//!   averages are fetched, the pool rolls over.
//! - `Running -> Complete`: the feed is exhausted; open positions are
//!   liquidated and the state is marked terminal.
//!
//! State is persisted after every transition, so a process killed between
//! steps resumes exactly where it stopped.

use crate::clock::SimulationClock;
use crate::config::SimConfig;
use crate::data::{PriceFeed, PriceSignal};
use crate::ledger::Ledger;
use crate::pool::StrategyPool;
use crate::state::{SessionState, StateStore};

use super::state::{EngineError, EngineState, RunSummary, StepOutcome};

pub struct SimulationEngine<F, L, S> {
    config: SimConfig,
    config_hash: String,
    symbol: String,
    pool: StrategyPool,
    clock: SimulationClock,
    state: EngineState,
    last_price: Option<f64>,
    feed: F,
    ledger: L,
    store: S,
    summary: RunSummary,
}

impl<F, L, S> SimulationEngine<F, L, S>
where
    F: PriceFeed,
    L: Ledger,
    S: StateStore,
{
    /// Build an engine from the persisted session.
    ///
    /// The state must already exist (the session bootstrap creates it) and
    /// must carry the hash of `config`. A terminal state yields an engine
    /// that is already `Complete`.
    pub fn new(config: SimConfig, feed: F, ledger: L, store: S) -> Result<Self, EngineError> {
        config.validate()?;
        let config_hash = config.config_hash();

        let persisted = store.load()?;
        persisted.validate()?;
        persisted.check_config(&config_hash)?;

        let mut engine = Self {
            pool: StrategyPool::from_config(&config),
            clock: persisted.clock(feed.total_days()),
            symbol: persisted.symbol.clone(),
            last_price: persisted.last_price.filter(|p| p.is_finite()),
            state: EngineState::Running,
            config,
            config_hash,
            feed,
            ledger,
            store,
            summary: RunSummary::default(),
        };

        if persisted.terminal {
            engine.pool.restore(&persisted);
            engine.state = EngineState::Complete;
            // A crash after the terminal save can leave the marker behind.
            engine.store.clear_session_marker()?;
            engine.summary.totals = engine.pool.totals();
            tracing::info!(symbol = %engine.symbol, "session already complete");
            return Ok(engine);
        }

        // Nothing has been persisted by an engine yet.
        let fresh = persisted.strategies.is_empty();
        let day = engine.clock.day_index();
        let averages = engine.feed.current_averages(day, &engine.pool.windows())?;
        engine.pool.initialize_from_store(&persisted, &averages)?;

        if fresh && day == 1 && engine.clock.is_day_start() {
            engine.ledger.record_day_start(day)?;
            // Once snapshots are stored, a restart no longer counts as fresh.
            engine.persist(false)?;
        }

        tracing::info!(
            symbol = %engine.symbol,
            position = %engine.clock.position(),
            total_days = engine.clock.total_days(),
            strategies = engine.pool.len(),
            "simulation engine ready"
        );
        Ok(engine)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == EngineState::Complete
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn pool(&self) -> &StrategyPool {
        &self.pool
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    /// Counters for the steps taken by this engine instance.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_parts(self) -> (F, L, S) {
        (self.feed, self.ledger, self.store)
    }

    /// Perform exactly one transition.
    pub fn step(&mut self) -> Result<StepOutcome, EngineError> {
        match self.state {
            EngineState::Complete => return Ok(StepOutcome::AlreadyComplete),
            EngineState::DayBoundary => {
                return Err(EngineError::Interrupted {
                    day: self.clock.day_index(),
                })
            }
            EngineState::Running => {}
        }

        if self.clock.is_series_complete() {
            return self.complete();
        }

        let position = self.clock.position();
        match self.feed.next_price(position)? {
            PriceSignal::Price(price) if price.is_finite() => self.apply_price(price),
            PriceSignal::Price(price) => self.skip_malformed(&price.to_string()),
            PriceSignal::Malformed(raw) => self.skip_malformed(&raw),
            PriceSignal::DayDone => self.roll_day(),
            PriceSignal::AllDone => self.complete(),
        }
    }

    /// Step until the session is complete.
    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        while !self.is_complete() {
            self.step()?;
        }
        Ok(self.summary.clone())
    }

    fn apply_price(&mut self, price: f64) -> Result<StepOutcome, EngineError> {
        let tick = self.clock.tick_index() as u64;
        if self.config.reporting.should_log_price(tick) {
            tracing::debug!(price, "price");
        }
        if self.config.reporting.should_log_index(tick) {
            tracing::debug!(
                day = self.clock.day_index(),
                tick,
                total_days = self.clock.total_days(),
                "clock"
            );
        }

        if self.config.reporting.should_record_price(tick) {
            self.ledger.record_price(self.clock.tick_index(), price)?;
        }

        let summary = self.pool.apply_tick(price, &mut self.ledger)?;
        self.last_price = Some(price);
        self.clock.advance_tick();
        self.persist(false)?;

        self.summary.ticks += 1;
        self.summary.buys += summary.buys as u64;
        self.summary.sells += summary.sells as u64;
        Ok(StepOutcome::Tick { price, summary })
    }

    fn skip_malformed(&mut self, raw: &str) -> Result<StepOutcome, EngineError> {
        tracing::error!(
            position = %self.clock.position(),
            raw,
            "malformed price, tick skipped"
        );
        self.clock.advance_tick();
        self.persist(false)?;
        self.summary.malformed_ticks += 1;
        Ok(StepOutcome::Malformed)
    }

    fn roll_day(&mut self) -> Result<StepOutcome, EngineError> {
        let next_day = self.clock.day_index() + 1;
        // Fetched before anything mutates, so a feed failure leaves the
        // persisted state at the end of the previous day.
        let averages = self.feed.current_averages(next_day, &self.pool.windows())?;

        self.state = EngineState::DayBoundary;
        tracing::info!(
            day = self.clock.day_index(),
            ticks = self.clock.tick_index() - 1,
            "day complete"
        );
        self.clock.roll_day();
        self.pool.apply_day_rollover(&averages, &mut self.ledger)?;
        if !self.clock.is_series_complete() {
            self.ledger.record_day_start(next_day)?;
        }
        self.persist(false)?;
        self.state = EngineState::Running;

        self.summary.days_rolled += 1;
        Ok(StepOutcome::DayRolled { day: next_day })
    }

    fn complete(&mut self) -> Result<StepOutcome, EngineError> {
        let liquidated = self.pool.finalize(self.last_price, &mut self.ledger)?;
        self.ledger.record_completion()?;
        self.state = EngineState::Complete;
        self.persist(true)?;
        self.store.clear_session_marker()?;

        self.summary.liquidated = liquidated;
        self.summary.totals = self.pool.totals();
        tracing::info!(
            symbol = %self.symbol,
            liquidated,
            total_profit = self.summary.total_profit(),
            "evaluation complete"
        );
        Ok(StepOutcome::Completed { liquidated })
    }

    fn persist(&mut self, terminal: bool) -> Result<(), EngineError> {
        let state = SessionState {
            symbol: self.symbol.clone(),
            day_index: self.clock.day_index(),
            tick_index: self.clock.tick_index(),
            totals: self.pool.totals(),
            terminal,
            config_hash: self.config_hash.clone(),
            last_price: self.last_price,
            strategies: self.pool.snapshots(),
        };
        self.store.save(&state)?;
        Ok(())
    }
}
