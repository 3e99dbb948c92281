//! Yahoo Finance data provider.
//!
//! Reads intraday and daily closes from Yahoo's v8 chart API. Requests go
//! through a [`RetryPolicy`] and a shared [`CircuitBreaker`]; a 403 trips the
//! breaker at once.
//!
//! Yahoo has no official API and changes format without notice. CSV import
//! is the fallback when it is unavailable.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DailyClose, DataError, DataProvider, DataSource, IntradayObservation};
use super::retry::RetryPolicy;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Timestamped closes from one chart response. Dates are exchange-local.
#[derive(Debug)]
struct ChartSeries {
    points: Vec<(NaiveDate, Option<f64>)>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn chart_url(symbol: &str, interval: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive; include all of `end`.
        let end_ts = (end + chrono::Duration::days(1))
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval={interval}"
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<ChartSeries, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let Some(timestamps) = data.timestamp else {
            // Yahoo omits timestamps entirely for ranges with no trading.
            return Ok(ChartSeries { points: Vec::new() });
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let offset = data.meta.gmtoffset;
        let points = timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| {
                let date = chrono::DateTime::from_timestamp(ts + offset, 0)
                    .map(|dt| dt.naive_utc().date())
                    .ok_or_else(|| {
                        DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                    })?;
                Ok((date, quote.close.get(i).copied().flatten()))
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        Ok(ChartSeries { points })
    }

    fn fetch_chart(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ChartSeries, DataError> {
        let url = Self::chart_url(symbol, interval, start, end);
        self.retry.run(|attempt| {
            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }
            tracing::debug!(symbol, interval, attempt, "requesting Yahoo chart");
            self.request_once(symbol, &url)
        })
    }

    fn request_once(&self, symbol: &str, url: &str) -> Result<ChartSeries, DataError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();

        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited { retry_after_secs });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let series = Self::parse_response(symbol, chart)?;
        self.circuit_breaker.record_success();
        Ok(series)
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch_intraday(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IntradayObservation>, DataError> {
        let series = self.fetch_chart(symbol, interval, start, end)?;
        // Missing closes stay in place as blank prices; replay reports them
        // as malformed ticks.
        Ok(series
            .points
            .into_iter()
            .map(|(date, close)| IntradayObservation {
                date,
                price: close.map(|c| c.to_string()).unwrap_or_default(),
            })
            .collect())
    }

    fn fetch_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, DataError> {
        let series = self.fetch_chart(symbol, "1d", start, end)?;
        Ok(series
            .points
            .into_iter()
            .filter_map(|(date, close)| close.map(|close| DailyClose { date, close }))
            .collect())
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
