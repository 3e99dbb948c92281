//! Deterministic synthetic market data for development and tests.
//!
//! Every weekday gets a daily close drawn from an RNG seeded by
//! `(symbol, date)`, so any date range yields the same values. Intraday ticks
//! bridge the previous weekday's close to the day's own close, which keeps
//! intraday and daily data consistent with each other.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DailyClose, DataError, DataProvider, DataSource, IntradayObservation};

/// Regular session length in minutes (09:30 to 16:00).
const SESSION_MINUTES: u32 = 390;

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }

    fn rng_for(symbol: &str, date: NaiveDate) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(&date.num_days_from_ce().to_le_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Close for one date. Slow cycles plus per-day noise around 100.
    pub fn close_on(symbol: &str, date: NaiveDate) -> f64 {
        let n = date.num_days_from_ce() as f64;
        let trend = 0.15 * (n / 45.0).sin() + 0.05 * (n / 11.0).sin();
        let noise: f64 = Self::rng_for(symbol, date).gen_range(-0.01..0.01);
        100.0 * trend.exp() * (1.0 + noise)
    }

    fn previous_weekday(date: NaiveDate) -> NaiveDate {
        let mut d = date - chrono::Duration::days(1);
        while is_weekend(d) {
            d -= chrono::Duration::days(1);
        }
        d
    }

    fn intraday_for(symbol: &str, date: NaiveDate, ticks: usize) -> Vec<f64> {
        let open = Self::close_on(symbol, Self::previous_weekday(date));
        let close = Self::close_on(symbol, date);
        let mut rng = Self::rng_for(symbol, date);
        // Skip the draw used for the daily close.
        let _: f64 = rng.gen_range(-0.01..0.01);

        (1..=ticks)
            .map(|i| {
                if i == ticks {
                    return close;
                }
                let t = i as f64 / ticks as f64;
                let noise: f64 = rng.gen_range(-0.004..0.004);
                (open + (close - open) * t) * (1.0 + noise)
            })
            .collect()
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn weekdays(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |d| *d <= end)
        .filter(|d| !is_weekend(*d))
}

/// Ticks in one regular session at `interval` (`"2m"`, `"1h"`, ...).
/// Unknown or daily-and-longer intervals give one tick.
pub fn ticks_per_session(interval: &str) -> usize {
    let interval = interval.trim();
    let split = interval
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(interval.len());
    let (digits, unit) = interval.split_at(split);
    let Ok(n) = digits.parse::<u32>() else {
        return 1;
    };
    if n == 0 {
        return 1;
    }
    let minutes = match unit {
        "m" => n,
        "h" => n * 60,
        _ => return 1,
    };
    SESSION_MINUTES.div_ceil(minutes).max(1) as usize
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch_intraday(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IntradayObservation>, DataError> {
        let ticks = ticks_per_session(interval);
        Ok(weekdays(start, end)
            .flat_map(|date| {
                Self::intraday_for(symbol, date, ticks)
                    .into_iter()
                    .map(move |p| IntradayObservation {
                        date,
                        price: format!("{p:.4}"),
                    })
            })
            .collect())
    }

    fn fetch_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, DataError> {
        Ok(weekdays(start, end)
            .map(|date| DailyClose {
                date,
                close: Self::close_on(symbol, date),
            })
            .collect())
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn interval_parsing() {
        assert_eq!(ticks_per_session("2m"), 195);
        assert_eq!(ticks_per_session("5m"), 78);
        assert_eq!(ticks_per_session("1h"), 7);
        assert_eq!(ticks_per_session("1d"), 1);
        assert_eq!(ticks_per_session("junk"), 1);
    }

    #[test]
    fn deterministic_per_symbol() {
        let p = SyntheticProvider::new();
        let a = p.fetch_daily_closes("SPY", d(1, 1), d(1, 31)).unwrap();
        let b = p.fetch_daily_closes("SPY", d(1, 15), d(1, 31)).unwrap();
        let c = p.fetch_daily_closes("QQQ", d(1, 1), d(1, 31)).unwrap();
        assert_eq!(a[a.len() - b.len()..], b[..]);
        assert_ne!(a, c);
    }

    #[test]
    fn skips_weekends() {
        let p = SyntheticProvider::new();
        // 2024-03-02 and 03-03 are a weekend.
        let closes = p.fetch_daily_closes("X", d(3, 1), d(3, 4)).unwrap();
        let dates: Vec<_> = closes.iter().map(|c| c.date).collect();
        assert_eq!(dates, vec![d(3, 1), d(3, 4)]);
    }

    #[test]
    fn intraday_ends_at_daily_close() {
        let p = SyntheticProvider::new();
        let ticks = p.fetch_intraday("X", "30m", d(3, 4), d(3, 4)).unwrap();
        assert_eq!(ticks.len(), 13);
        let last: f64 = ticks.last().unwrap().price.parse().unwrap();
        let close = SyntheticProvider::close_on("X", d(3, 4));
        assert!((last - close).abs() < 1e-3);
        assert!(ticks.iter().all(|t| t.price.parse::<f64>().unwrap() > 0.0));
    }
}
