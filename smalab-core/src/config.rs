//! Session configuration: window range, evaluation span, trading rules, reporting.
//!
//! Parsing from TOML happens in the runner; this module owns the types, their
//! defaults, validation and the configuration hash that pins a persisted
//! session to the settings that produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TradingRules;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("window length must be positive")]
    ZeroWindow,

    #[error("window step must be positive")]
    ZeroStep,

    #[error("window range is empty: min {min} > max {max}")]
    EmptyWindowRange { min: u32, max: u32 },

    #[error("trading fee must be positive and finite, got {0}")]
    InvalidFee(f64),

    #[error("downtime must be at least one day")]
    ZeroDowntime,

    #[error("{name} must be finite, got {value}")]
    NonFiniteThreshold { name: &'static str, value: f64 },

    #[error("evaluation must cover at least one day")]
    ZeroEvaluationDays,

    #[error("intraday interval must not be empty")]
    EmptyInterval,
}

/// Inclusive range of SMA window lengths, stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowRange {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl Default for WindowRange {
    fn default() -> Self {
        Self {
            min: 1,
            max: 200,
            step: 1,
        }
    }
}

impl WindowRange {
    /// Window lengths in increasing order.
    pub fn windows(&self) -> Vec<u32> {
        if self.step == 0 || self.min > self.max {
            return Vec::new();
        }
        (self.min..=self.max).step_by(self.step as usize).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.min > self.max {
            return Err(ConfigError::EmptyWindowRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Trading days replayed, counted back from the most recent.
    pub days: u32,
    /// Intraday bar interval requested from the provider (e.g. "2m").
    pub intraday_interval: String,
    /// Calendar days of daily closes fetched for the moving averages.
    pub history_days: u32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            days: 60,
            intraday_interval: "2m".to_string(),
            history_days: 1000,
        }
    }
}

/// Diagnostic logging cadence. 0 logs every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub price_log_interval: u64,
    pub index_log_interval: u64,
    /// Cadence of `Price`/`Price Index` lines in the evaluation log.
    pub evallog_interval: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            price_log_interval: 100,
            index_log_interval: 100,
            evallog_interval: 100,
        }
    }
}

impl ReportingConfig {
    pub fn should_log_price(&self, tick: u64) -> bool {
        every(self.price_log_interval, tick)
    }

    pub fn should_log_index(&self, tick: u64) -> bool {
        every(self.index_log_interval, tick)
    }

    pub fn should_record_price(&self, tick: u64) -> bool {
        every(self.evallog_interval, tick)
    }
}

fn every(interval: u64, tick: u64) -> bool {
    interval == 0 || tick % interval == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimConfig {
    pub windows: WindowRange,
    pub evaluation: EvaluationConfig,
    pub trading: TradingRules,
    pub reporting: ReportingConfig,
}

impl SimConfig {
    /// Reject inconsistent settings before any tick is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.windows.validate()?;

        let t = &self.trading;
        if !(t.fee.is_finite() && t.fee > 0.0) {
            return Err(ConfigError::InvalidFee(t.fee));
        }
        if t.downtime_days == 0 {
            return Err(ConfigError::ZeroDowntime);
        }
        for (name, value) in [
            ("buy_threshold", t.buy_threshold),
            ("sell_threshold", t.sell_threshold),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteThreshold { name, value });
            }
        }

        if self.evaluation.days == 0 {
            return Err(ConfigError::ZeroEvaluationDays);
        }
        if self.evaluation.intraday_interval.trim().is_empty() {
            return Err(ConfigError::EmptyInterval);
        }
        Ok(())
    }

    /// BLAKE3 hash over everything that changes strategy outcomes.
    ///
    /// Reporting cadence and data-fetch settings are excluded so they can be
    /// changed between a run and its resume.
    pub fn config_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.windows.min.to_le_bytes());
        hasher.update(&self.windows.max.to_le_bytes());
        hasher.update(&self.windows.step.to_le_bytes());

        let t = &self.trading;
        hasher.update(t.mode.as_str().as_bytes());
        hasher.update(&t.buy_threshold.to_le_bytes());
        hasher.update(&t.sell_threshold.to_le_bytes());
        hasher.update(&t.fee.to_le_bytes());
        hasher.update(&t.downtime_days.to_le_bytes());

        hasher.finalize().to_hex().to_string()
    }
}
