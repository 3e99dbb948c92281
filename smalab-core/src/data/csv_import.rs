//! CSV import provider: the offline fallback when Yahoo is unavailable.
//!
//! Expects two files in one directory:
//! - `intraday.csv` with columns `date,price`, rows in time order
//! - `daily.csv` with columns `date,close`

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::provider::{DailyClose, DataError, DataProvider, DataSource, IntradayObservation};
use super::snapshot::{read_daily_csv, read_intraday_csv};

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn intraday_path(&self) -> PathBuf {
        self.dir.join("intraday.csv")
    }

    fn daily_path(&self) -> PathBuf {
        self.dir.join("daily.csv")
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    // The interval is whatever the file was recorded at.
    fn fetch_intraday(
        &self,
        _symbol: &str,
        _interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IntradayObservation>, DataError> {
        Ok(read_intraday_csv(&self.intraday_path())?
            .into_iter()
            .filter(|o| o.date >= start && o.date <= end)
            .collect())
    }

    fn fetch_daily_closes(
        &self,
        _symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, DataError> {
        Ok(read_daily_csv(&self.daily_path())?
            .into_iter()
            .filter(|c| c.date >= start && c.date <= end)
            .collect())
    }

    fn is_available(&self) -> bool {
        self.intraday_path().is_file() && self.daily_path().is_file()
    }

    fn latest_intraday_date(&self, _symbol: &str) -> Result<Option<NaiveDate>, DataError> {
        Ok(read_intraday_csv(&self.intraday_path())?
            .iter()
            .map(|o| o.date)
            .max())
    }
}
