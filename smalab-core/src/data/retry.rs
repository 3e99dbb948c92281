//! Exponential backoff for transient provider failures.

use std::time::Duration;

use super::provider::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Used in tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before `attempt` (0 is the first attempt and never waits).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt - 1))
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// `op` receives the attempt number. Only errors for which
    /// [`DataError::is_transient`] holds are retried; the last one is returned
    /// once the budget is spent.
    pub fn run<T, F>(&self, mut op: F) -> Result<T, DataError>
    where
        F: FnMut(u32) -> Result<T, DataError>,
    {
        let mut attempt = 0;
        loop {
            let delay = self.delay_for(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    tracing::warn!(attempt, error = %e, "transient data error, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
