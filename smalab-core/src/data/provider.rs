//! Data provider trait and structured error types.
//!
//! A `DataProvider` fetches raw intraday prices and daily closes for a symbol.
//! Providers are only used when a session starts: their output is frozen into
//! a [`MarketSnapshot`](super::snapshot::MarketSnapshot) that the engine
//! replays, so a resumed session sees exactly the same data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no intraday data for '{symbol}' in the requested range")]
    NoIntradayData { symbol: String },

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("csv error in {path}: {reason}")]
    Csv { path: String, reason: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_) | DataError::RateLimited { .. } | DataError::Other(_)
        )
    }
}

/// One raw intraday observation. The price stays textual until replay so a
/// malformed value surfaces as a data-quality event at the tick it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradayObservation {
    pub date: NaiveDate,
    pub price: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
    Snapshot,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataSource::YahooFinance => "yahoo",
            DataSource::CsvImport => "csv",
            DataSource::Synthetic => "synthetic",
            DataSource::Snapshot => "snapshot",
        };
        f.write_str(name)
    }
}

/// Trait for market data sources (Yahoo Finance, CSV import, synthetic).
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    /// Intraday closes at `interval` for every trading date in `[start, end]`,
    /// ordered by time.
    fn fetch_intraday(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IntradayObservation>, DataError>;

    /// Daily closes in `[start, end]`, ordered by date.
    fn fetch_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;

    /// Last date with intraday data, for recorded sources whose data does
    /// not run up to today. Live sources return `None`.
    fn latest_intraday_date(&self, _symbol: &str) -> Result<Option<NaiveDate>, DataError> {
        Ok(None)
    }
}
