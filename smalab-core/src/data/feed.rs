//! The price feed seam between market data and the engine.

use thiserror::Error;

use super::provider::DataError;
use crate::clock::ClockPosition;

/// What the feed has at a given clock position.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceSignal {
    /// A usable intraday price.
    Price(f64),
    /// The raw value could not be turned into a finite price.
    Malformed(String),
    /// No more ticks today.
    DayDone,
    /// Every configured day has been replayed.
    AllDone,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed unavailable for day {day}: {reason}")]
    Unavailable { day: u32, reason: String },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Source of prices and daily SMA marks.
///
/// Lookups are addressed by clock position rather than by an internal
/// cursor, so a resumed engine sees the same signal at the same position.
pub trait PriceFeed {
    /// Number of evaluation days available.
    fn total_days(&self) -> u32;

    fn next_price(&mut self, position: ClockPosition) -> Result<PriceSignal, FeedError>;

    /// One SMA value per window, in the order given. NaN where history is
    /// too short.
    fn current_averages(&mut self, day: u32, windows: &[u32]) -> Result<Vec<f64>, FeedError>;
}

/// Parse a raw tick value. Blank, unparseable and non-finite values are
/// all malformed.
pub fn parse_price(raw: &str) -> PriceSignal {
    match raw.trim().parse::<f64>() {
        Ok(price) if price.is_finite() => PriceSignal::Price(price),
        _ => PriceSignal::Malformed(raw.to_string()),
    }
}
