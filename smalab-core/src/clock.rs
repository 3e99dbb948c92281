//! Day/tick clock for the simulation loop.

use serde::{Deserialize, Serialize};

/// Where the simulation is: 1-based day and 1-based tick within the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClockPosition {
    pub day: u32,
    pub tick: u32,
}

impl std::fmt::Display for ClockPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "day {} tick {}", self.day, self.tick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    day_index: u32,
    tick_index: u32,
    total_days: u32,
}

impl SimulationClock {
    /// Fresh clock at day 1, tick 1.
    pub fn new(total_days: u32) -> Self {
        Self::at(1, 1, total_days)
    }

    /// Clock rehydrated from a persisted position. Indices are clamped to 1.
    pub fn at(day_index: u32, tick_index: u32, total_days: u32) -> Self {
        Self {
            day_index: day_index.max(1),
            tick_index: tick_index.max(1),
            total_days,
        }
    }

    pub fn day_index(&self) -> u32 {
        self.day_index
    }

    pub fn tick_index(&self) -> u32 {
        self.tick_index
    }

    pub fn total_days(&self) -> u32 {
        self.total_days
    }

    pub fn position(&self) -> ClockPosition {
        ClockPosition {
            day: self.day_index,
            tick: self.tick_index,
        }
    }

    pub fn advance_tick(&mut self) {
        self.tick_index += 1;
    }

    /// Move to the first tick of the next day.
    pub fn roll_day(&mut self) {
        self.day_index += 1;
        self.tick_index = 1;
    }

    /// True at tick 1 of any day.
    pub fn is_day_start(&self) -> bool {
        self.tick_index == 1
    }

    /// True once every configured day has been rolled past.
    pub fn is_series_complete(&self) -> bool {
        self.day_index > self.total_days
    }
}
