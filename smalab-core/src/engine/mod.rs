//! Simulation engine: drives the strategy pool through a replayed session.
//!
//! The engine owns its feed, ledger and store. It reads the store once at
//! construction and writes it after every step.

pub mod simulation;
pub mod state;

pub use simulation::SimulationEngine;
pub use state::{EngineError, EngineState, RunSummary, StepOutcome};
