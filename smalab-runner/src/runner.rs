//! Session runner: wires the replay feed, text ledger and file store into
//! the simulation engine and runs it to completion.

use smalab_core::data::ReplayFeed;
use smalab_core::engine::{EngineError, RunSummary, SimulationEngine};
use smalab_core::ledger::LedgerError;
use thiserror::Error;

use crate::file_store::JsonFileStore;
use crate::session::Session;
use crate::text_ledger::TextLedger;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot open evaluation log: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type SessionEngine = SimulationEngine<ReplayFeed, TextLedger, JsonFileStore>;

/// Build the engine for `session` from its persisted state.
pub fn build_engine(session: &Session) -> Result<SessionEngine, RunError> {
    let ledger = TextLedger::open(&session.paths.evaluation_log())?;
    let store = JsonFileStore::new(session.paths.clone());
    let feed = ReplayFeed::new(session.snapshot.clone());
    Ok(SimulationEngine::new(
        session.config.clone(),
        feed,
        ledger,
        store,
    )?)
}

/// Run `session` until every configured day is processed.
pub fn run_session(session: &Session) -> Result<RunSummary, RunError> {
    let mut engine = build_engine(session)?;
    let summary = engine.run()?;
    if let Some((window, profit)) = summary.best_window() {
        tracing::info!(
            symbol = %session.paths.symbol(),
            ticks = summary.ticks,
            malformed = summary.malformed_ticks,
            best_window = window,
            best_profit = profit,
            "run finished"
        );
    }
    Ok(summary)
}
