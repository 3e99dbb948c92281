//! Frozen market data for one session.
//!
//! Layout in the session directory:
//! - `{SYMBOL}_intraday.csv`: `date,price`, one row per tick, time-ordered
//! - `{SYMBOL}_daily.csv`: `date,close`, one row per trading day
//!
//! Writes are atomic (write to .tmp, rename into place).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::provider::{DailyClose, DataError, DataProvider, DataSource, IntradayObservation};
use crate::config::EvaluationConfig;

/// One evaluation day: its date and raw tick prices in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingDay {
    pub date: NaiveDate,
    pub prices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub days: Vec<TradingDay>,
    /// Daily closes ascending by date, unique dates.
    pub closes: Vec<DailyClose>,
    pub source: DataSource,
}

#[derive(Debug, Serialize, Deserialize)]
struct IntradayRow {
    date: NaiveDate,
    price: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DailyRow {
    date: NaiveDate,
    close: f64,
}

impl MarketSnapshot {
    /// Group observations into trading days and keep the most recent
    /// `eval_days` of them. Tick order within a day is preserved.
    pub fn from_observations(
        symbol: impl Into<String>,
        intraday: Vec<IntradayObservation>,
        closes: Vec<DailyClose>,
        eval_days: u32,
        source: DataSource,
    ) -> Result<Self, DataError> {
        let symbol = symbol.into();

        let mut by_date: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
        for obs in intraday {
            by_date.entry(obs.date).or_default().push(obs.price);
        }
        if by_date.is_empty() {
            return Err(DataError::NoIntradayData { symbol });
        }

        let skip = by_date.len().saturating_sub(eval_days as usize);
        let days: Vec<TradingDay> = by_date
            .into_iter()
            .skip(skip)
            .map(|(date, prices)| TradingDay { date, prices })
            .collect();

        let mut closes = closes;
        closes.sort_by_key(|c| c.date);
        closes.dedup_by_key(|c| c.date);

        Ok(Self {
            symbol,
            days,
            closes,
            source,
        })
    }

    /// Fetch everything a session needs from `provider`.
    ///
    /// The window ends at `today`, or at the provider's last recorded date
    /// for sources that do not run up to today.
    pub fn fetch(
        provider: &dyn DataProvider,
        symbol: &str,
        config: &EvaluationConfig,
        today: NaiveDate,
    ) -> Result<Self, DataError> {
        let today = provider.latest_intraday_date(symbol)?.unwrap_or(today);
        let intraday_start = today - chrono::Duration::days(intraday_lookback_days(config) as i64);
        let history_start = today - chrono::Duration::days(config.history_days as i64);

        tracing::info!(
            provider = provider.name(),
            symbol,
            %intraday_start,
            %history_start,
            %today,
            "fetching market data"
        );

        let intraday =
            provider.fetch_intraday(symbol, &config.intraday_interval, intraday_start, today)?;
        let closes = provider.fetch_daily_closes(symbol, history_start, today)?;

        let snapshot =
            Self::from_observations(symbol, intraday, closes, config.days, provider.source())?;
        if (snapshot.days.len() as u32) < config.days {
            tracing::warn!(
                available = snapshot.days.len(),
                requested = config.days,
                "fewer trading days available than requested"
            );
        }
        Ok(snapshot)
    }

    pub fn total_days(&self) -> u32 {
        self.days.len() as u32
    }

    /// 1-based day lookup.
    pub fn day(&self, day: u32) -> Option<&TradingDay> {
        (day as usize)
            .checked_sub(1)
            .and_then(|i| self.days.get(i))
    }

    /// Closes dated strictly before `date`, ascending.
    pub fn closes_before(&self, date: NaiveDate) -> Vec<f64> {
        self.closes
            .iter()
            .take_while(|c| c.date < date)
            .map(|c| c.close)
            .collect()
    }

    pub fn all_closes(&self) -> Vec<f64> {
        self.closes.iter().map(|c| c.close).collect()
    }

    pub fn intraday_path(dir: &Path, symbol: &str) -> PathBuf {
        dir.join(format!("{symbol}_intraday.csv"))
    }

    pub fn daily_path(dir: &Path, symbol: &str) -> PathBuf {
        dir.join(format!("{symbol}_daily.csv"))
    }

    /// Persist both CSV files into `dir`.
    pub fn write_csv(&self, dir: &Path) -> Result<(), DataError> {
        fs::create_dir_all(dir)
            .map_err(|e| DataError::Snapshot(format!("failed to create dir: {e}")))?;

        let intraday_rows = self.days.iter().flat_map(|day| {
            day.prices.iter().map(move |price| IntradayRow {
                date: day.date,
                price: price.clone(),
            })
        });
        write_rows(&Self::intraday_path(dir, &self.symbol), intraday_rows)?;

        let daily_rows = self.closes.iter().map(|c| DailyRow {
            date: c.date,
            close: c.close,
        });
        write_rows(&Self::daily_path(dir, &self.symbol), daily_rows)?;
        Ok(())
    }

    /// Load a snapshot previously written by [`write_csv`](Self::write_csv).
    pub fn read_csv(dir: &Path, symbol: &str) -> Result<Self, DataError> {
        let intraday = read_intraday_csv(&Self::intraday_path(dir, symbol))?;
        let closes = read_daily_csv(&Self::daily_path(dir, symbol))?;
        // Already trimmed when written; keep every stored day.
        Self::from_observations(symbol, intraday, closes, u32::MAX, DataSource::Snapshot)
    }

    /// BLAKE3 over every stored value, for provenance logging.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        for day in &self.days {
            hasher.update(day.date.to_string().as_bytes());
            for price in &day.prices {
                hasher.update(price.as_bytes());
                hasher.update(b"\n");
            }
        }
        for close in &self.closes {
            hasher.update(close.date.to_string().as_bytes());
            hasher.update(&close.close.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Calendar days to request so that `config.days` trading days are covered.
///
/// Minute-level intervals are capped at 59 days, the furthest back Yahoo
/// serves them.
pub fn intraday_lookback_days(config: &EvaluationConfig) -> u32 {
    let wanted = config.days.saturating_mul(7).div_ceil(5) + 4;
    let interval = config.intraday_interval.trim();
    let minute_based = interval.ends_with('m') && !interval.ends_with("mo");
    if minute_based {
        wanted.min(59)
    } else {
        wanted
    }
}

pub fn read_intraday_csv(path: &Path) -> Result<Vec<IntradayObservation>, DataError> {
    let rows: Vec<IntradayRow> = read_rows(path)?;
    Ok(rows
        .into_iter()
        .map(|r| IntradayObservation {
            date: r.date,
            price: r.price,
        })
        .collect())
}

pub fn read_daily_csv(path: &Path) -> Result<Vec<DailyClose>, DataError> {
    let rows: Vec<DailyRow> = read_rows(path)?;
    Ok(rows
        .into_iter()
        .map(|r| DailyClose {
            date: r.date,
            close: r.close,
        })
        .collect())
}

fn csv_error(path: &Path, reason: impl std::fmt::Display) -> DataError {
    DataError::Csv {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, DataError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| csv_error(path, e))
}

fn write_rows<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> Result<(), DataError> {
    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp_path).map_err(|e| csv_error(path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| csv_error(path, e))?;
        }
        writer.flush().map_err(|e| csv_error(path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Snapshot(format!("atomic rename failed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn obs(day: u32, price: &str) -> IntradayObservation {
        IntradayObservation {
            date: d(day),
            price: price.to_string(),
        }
    }

    #[test]
    fn groups_by_date_and_keeps_recent_days() {
        let intraday = vec![
            obs(4, "10"),
            obs(4, "11"),
            obs(5, "12"),
            obs(6, "13"),
            obs(6, "x"),
        ];
        let snap =
            MarketSnapshot::from_observations("T", intraday, vec![], 2, DataSource::Synthetic)
                .unwrap();
        assert_eq!(snap.total_days(), 2);
        assert_eq!(snap.day(1).unwrap().date, d(5));
        assert_eq!(snap.day(2).unwrap().prices, vec!["13", "x"]);
        assert!(snap.day(0).is_none());
        assert!(snap.day(3).is_none());
    }

    #[test]
    fn empty_intraday_is_an_error() {
        let err = MarketSnapshot::from_observations("T", vec![], vec![], 5, DataSource::CsvImport)
            .unwrap_err();
        assert!(matches!(err, DataError::NoIntradayData { .. }));
    }

    #[test]
    fn closes_are_sorted_and_cut_before_date() {
        let closes = vec![
            DailyClose { date: d(3), close: 3.0 },
            DailyClose { date: d(1), close: 1.0 },
            DailyClose { date: d(2), close: 2.0 },
            DailyClose { date: d(2), close: 2.0 },
        ];
        let snap = MarketSnapshot::from_observations(
            "T",
            vec![obs(3, "1")],
            closes,
            1,
            DataSource::CsvImport,
        )
        .unwrap();
        assert_eq!(snap.closes.len(), 3);
        assert_eq!(snap.closes_before(d(3)), vec![1.0, 2.0]);
        assert_eq!(snap.all_closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn csv_roundtrip_preserves_raw_prices() {
        let dir = tempfile::tempdir().unwrap();
        let snap = MarketSnapshot::from_observations(
            "ABC",
            vec![obs(4, "101.25"), obs(4, ""), obs(5, "99.5")],
            vec![DailyClose { date: d(1), close: 100.0 }],
            10,
            DataSource::Synthetic,
        )
        .unwrap();
        snap.write_csv(dir.path()).unwrap();

        let back = MarketSnapshot::read_csv(dir.path(), "ABC").unwrap();
        assert_eq!(back.days, snap.days);
        assert_eq!(back.closes, snap.closes);
        assert_eq!(back.source, DataSource::Snapshot);
        assert_eq!(back.dataset_hash(), snap.dataset_hash());
    }

    #[test]
    fn missing_csv_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = MarketSnapshot::read_csv(dir.path(), "NONE").unwrap_err();
        assert!(matches!(err, DataError::Csv { .. }));
    }

    #[test]
    fn minute_intervals_cap_lookback() {
        let mut config = EvaluationConfig::default();
        assert_eq!(intraday_lookback_days(&config), 59);
        config.intraday_interval = "1h".into();
        assert_eq!(intraday_lookback_days(&config), 88);
        config.days = 5;
        config.intraday_interval = "2m".into();
        assert_eq!(intraday_lookback_days(&config), 11);
    }
}
