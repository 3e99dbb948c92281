//! Deterministic replay of a frozen [`MarketSnapshot`].

use super::feed::{parse_price, FeedError, PriceFeed, PriceSignal};
use super::snapshot::MarketSnapshot;
use crate::clock::ClockPosition;
use crate::indicators::trailing_averages;

#[derive(Debug, Clone)]
pub struct ReplayFeed {
    snapshot: MarketSnapshot,
}

impl ReplayFeed {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &MarketSnapshot {
        &self.snapshot
    }

    /// Closes visible on `day`: everything dated before it. Past the last
    /// evaluation day the whole history is visible.
    fn visible_closes(&self, day: u32) -> Vec<f64> {
        match self.snapshot.day(day) {
            Some(trading_day) => self.snapshot.closes_before(trading_day.date),
            None => self.snapshot.all_closes(),
        }
    }
}

impl PriceFeed for ReplayFeed {
    fn total_days(&self) -> u32 {
        self.snapshot.total_days()
    }

    fn next_price(&mut self, position: ClockPosition) -> Result<PriceSignal, FeedError> {
        if position.day > self.snapshot.total_days() {
            return Ok(PriceSignal::AllDone);
        }
        let day = self
            .snapshot
            .day(position.day)
            .ok_or_else(|| FeedError::Unavailable {
                day: position.day,
                reason: "day index out of range".into(),
            })?;

        let signal = match (position.tick as usize)
            .checked_sub(1)
            .and_then(|i| day.prices.get(i))
        {
            Some(raw) => parse_price(raw),
            None => PriceSignal::DayDone,
        };
        Ok(signal)
    }

    fn current_averages(&mut self, day: u32, windows: &[u32]) -> Result<Vec<f64>, FeedError> {
        if day == 0 {
            return Err(FeedError::Unavailable {
                day,
                reason: "days are 1-based".into(),
            });
        }
        Ok(trailing_averages(&self.visible_closes(day), windows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DailyClose, DataSource, IntradayObservation};
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn feed() -> ReplayFeed {
        let intraday = vec![
            IntradayObservation { date: date(6), price: "10".into() },
            IntradayObservation { date: date(6), price: "bad".into() },
            IntradayObservation { date: date(7), price: "12".into() },
        ];
        let closes = (1..=7)
            .map(|d| DailyClose { date: date(d), close: d as f64 })
            .collect();
        let snapshot =
            MarketSnapshot::from_observations("T", intraday, closes, 5, DataSource::Synthetic)
                .unwrap();
        ReplayFeed::new(snapshot)
    }

    fn at(day: u32, tick: u32) -> ClockPosition {
        ClockPosition { day, tick }
    }

    #[test]
    fn walks_ticks_then_day_boundaries() {
        let mut feed = feed();
        assert_eq!(feed.total_days(), 2);
        assert_eq!(feed.next_price(at(1, 1)).unwrap(), PriceSignal::Price(10.0));
        assert!(matches!(
            feed.next_price(at(1, 2)).unwrap(),
            PriceSignal::Malformed(_)
        ));
        assert_eq!(feed.next_price(at(1, 3)).unwrap(), PriceSignal::DayDone);
        assert_eq!(feed.next_price(at(2, 1)).unwrap(), PriceSignal::Price(12.0));
        assert_eq!(feed.next_price(at(2, 2)).unwrap(), PriceSignal::DayDone);
        assert_eq!(feed.next_price(at(3, 1)).unwrap(), PriceSignal::AllDone);
    }

    #[test]
    fn same_position_gives_same_signal() {
        let mut feed = feed();
        let first = feed.next_price(at(2, 1)).unwrap();
        assert_eq!(feed.next_price(at(2, 1)).unwrap(), first);
    }

    #[test]
    fn averages_exclude_the_evaluation_day() {
        let mut feed = feed();
        // Day 1 is May 6: closes 1..=5 are visible.
        let avgs = feed.current_averages(1, &[1, 5, 6]).unwrap();
        assert_eq!(avgs[0], 5.0);
        assert_eq!(avgs[1], 3.0);
        assert!(avgs[2].is_nan());
        // Past the end: the full history.
        let avgs = feed.current_averages(3, &[1]).unwrap();
        assert_eq!(avgs[0], 7.0);
    }

    #[test]
    fn day_zero_is_rejected() {
        assert!(feed().current_averages(0, &[1]).is_err());
    }
}
