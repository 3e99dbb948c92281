//! Shared fixtures for engine integration and property tests.

#![allow(dead_code)]

use smalab_core::clock::ClockPosition;
use smalab_core::config::{SimConfig, WindowRange};
use smalab_core::data::{parse_price, FeedError, PriceFeed, PriceSignal};
use smalab_core::domain::{TradeMode, TradingRules};
use smalab_core::ledger::MemoryLedger;
use smalab_core::state::{MemoryStore, SessionState};
use smalab_core::SimulationEngine;

/// Feed driven by an in-memory script of raw tick values per day.
///
/// The average for window `w` on day `d` is `day_averages[d - 1] + w * spread`
/// (the last entry is reused past the end).
#[derive(Debug, Clone)]
pub struct ScriptedFeed {
    pub days: Vec<Vec<String>>,
    pub day_averages: Vec<f64>,
    pub spread: f64,
    /// Fail `current_averages` for this day.
    pub fail_averages_on: Option<u32>,
}

impl ScriptedFeed {
    pub fn new(days: Vec<Vec<&str>>, day_averages: Vec<f64>) -> Self {
        Self {
            days: days
                .into_iter()
                .map(|d| d.into_iter().map(str::to_string).collect())
                .collect(),
            day_averages,
            spread: 0.0,
            fail_averages_on: None,
        }
    }

    pub fn from_prices(days: Vec<Vec<f64>>, day_averages: Vec<f64>) -> Self {
        Self {
            days: days
                .into_iter()
                .map(|d| d.into_iter().map(|p| p.to_string()).collect())
                .collect(),
            day_averages,
            spread: 0.0,
            fail_averages_on: None,
        }
    }

    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = spread;
        self
    }
}

impl PriceFeed for ScriptedFeed {
    fn total_days(&self) -> u32 {
        self.days.len() as u32
    }

    fn next_price(&mut self, position: ClockPosition) -> Result<PriceSignal, FeedError> {
        let Some(day) = self.days.get(position.day as usize - 1) else {
            return Ok(PriceSignal::AllDone);
        };
        Ok(match day.get(position.tick as usize - 1) {
            Some(raw) => parse_price(raw),
            None => PriceSignal::DayDone,
        })
    }

    fn current_averages(&mut self, day: u32, windows: &[u32]) -> Result<Vec<f64>, FeedError> {
        if self.fail_averages_on == Some(day) {
            return Err(FeedError::Unavailable {
                day,
                reason: "scripted failure".into(),
            });
        }
        let base = self
            .day_averages
            .get(day as usize - 1)
            .or(self.day_averages.last())
            .copied()
            .unwrap_or(f64::NAN);
        Ok(windows
            .iter()
            .map(|&w| base + w as f64 * self.spread)
            .collect())
    }
}

pub fn rules(mode: TradeMode) -> TradingRules {
    TradingRules {
        mode,
        buy_threshold: 1.0,
        sell_threshold: 1.0,
        fee: 0.1,
        downtime_days: 2,
    }
}

pub fn config(min: u32, max: u32, mode: TradeMode) -> SimConfig {
    SimConfig {
        windows: WindowRange { min, max, step: 1 },
        trading: rules(mode),
        ..SimConfig::default()
    }
}

pub fn fresh_store(config: &SimConfig) -> MemoryStore {
    MemoryStore::with_state(SessionState::fresh("TEST", config.config_hash()))
}

pub type TestEngine = SimulationEngine<ScriptedFeed, MemoryLedger, MemoryStore>;

pub fn engine(config: &SimConfig, feed: ScriptedFeed) -> TestEngine {
    SimulationEngine::new(config.clone(), feed, MemoryLedger::new(), fresh_store(config))
        .expect("engine builds")
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
