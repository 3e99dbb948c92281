//! Persisted session state and the store abstraction.
//!
//! The engine is the only component that reads or writes through a
//! [`StateStore`]. It loads once at startup and saves after every tick and
//! day transition. A save must be atomic: a crash mid-write has to leave the
//! previous state readable.

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{ClockPosition, SimulationClock};
use crate::domain::StrategySnapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no persisted session state at {0}")]
    Missing(String),

    #[error("persisted session state is corrupt: {0}")]
    Corrupt(String),

    #[error(
        "persisted state was produced by a different configuration \
         (stored {stored}, current {current})"
    )]
    ConfigMismatch { stored: String, current: String },

    #[error("state store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Everything needed to resume a session without replaying history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub symbol: String,
    /// Current simulated day, 1-based.
    pub day_index: u32,
    /// Current tick within the day, 1-based.
    pub tick_index: u32,
    /// Cumulative realized profit per window length.
    pub totals: BTreeMap<u32, f64>,
    /// Set once every configured day has been processed.
    pub terminal: bool,
    pub config_hash: String,
    /// Last valid price seen, used to liquidate at series end.
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub strategies: Vec<StrategySnapshot>,
}

impl SessionState {
    /// Empty state for a brand-new session.
    pub fn fresh(symbol: impl Into<String>, config_hash: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            day_index: 1,
            tick_index: 1,
            totals: BTreeMap::new(),
            terminal: false,
            config_hash: config_hash.into(),
            last_price: None,
            strategies: Vec::new(),
        }
    }

    pub fn position(&self) -> ClockPosition {
        ClockPosition {
            day: self.day_index,
            tick: self.tick_index,
        }
    }

    pub fn clock(&self, total_days: u32) -> SimulationClock {
        SimulationClock::at(self.day_index, self.tick_index, total_days)
    }

    /// Structural checks. Anything failing here is reported as corruption
    /// rather than patched with a default.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.symbol.trim().is_empty() {
            return Err(StoreError::Corrupt("empty symbol".into()));
        }
        if self.day_index == 0 || self.tick_index == 0 {
            return Err(StoreError::Corrupt(format!(
                "indices are 1-based, found day {} tick {}",
                self.day_index, self.tick_index
            )));
        }
        if let Some((window, value)) = self.totals.iter().find(|(_, v)| !v.is_finite()) {
            return Err(StoreError::Corrupt(format!(
                "non-finite total {value} for window {window}"
            )));
        }
        for snap in &self.strategies {
            if let Some(entry) = snap.position.entry_price() {
                if !entry.is_finite() {
                    return Err(StoreError::Corrupt(format!(
                        "non-finite entry price for window {}",
                        snap.window
                    )));
                }
            }
        }
        Ok(())
    }

    /// Verify the state belongs to the current configuration.
    pub fn check_config(&self, current_hash: &str) -> Result<(), StoreError> {
        if self.config_hash != current_hash {
            return Err(StoreError::ConfigMismatch {
                stored: self.config_hash.clone(),
                current: current_hash.to_string(),
            });
        }
        Ok(())
    }

    pub fn snapshot_for(&self, window: u32) -> Option<&StrategySnapshot> {
        self.strategies.iter().find(|s| s.window == window)
    }
}

/// Durable session state.
pub trait StateStore {
    /// Read the full state. A missing or unreadable state is an error.
    fn load(&self) -> Result<SessionState, StoreError>;

    /// Replace the persisted state atomically.
    fn save(&mut self, state: &SessionState) -> Result<(), StoreError>;

    /// Drop the active-session marker once the session has completed.
    fn clear_session_marker(&mut self) -> Result<(), StoreError>;
}

/// In-memory store for tests and benchmarks.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Option<SessionState>,
    saves: usize,
    marker: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a state and an active marker.
    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: Some(state),
            saves: 0,
            marker: true,
        }
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn has_marker(&self) -> bool {
        self.marker
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<SessionState, StoreError> {
        self.state
            .clone()
            .ok_or_else(|| StoreError::Missing("memory".into()))
    }

    fn save(&mut self, state: &SessionState) -> Result<(), StoreError> {
        self.state = Some(state.clone());
        self.saves += 1;
        Ok(())
    }

    fn clear_session_marker(&mut self) -> Result<(), StoreError> {
        self.marker = false;
        Ok(())
    }
}
