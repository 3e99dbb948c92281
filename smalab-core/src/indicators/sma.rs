//! Simple Moving Average (SMA).
//!
//! Mean of the last `period` closes. Any NaN inside the window makes the
//! result NaN, as does having fewer than `period` closes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// SMA over the trailing `period` values of `closes`.
    pub fn last(&self, closes: &[f64]) -> f64 {
        if closes.len() < self.period {
            return f64::NAN;
        }
        let window = &closes[closes.len() - self.period..];
        if window.iter().any(|c| c.is_nan()) {
            return f64::NAN;
        }
        window.iter().sum::<f64>() / self.period as f64
    }
}

/// Averages for several windows over the same closes, in window order.
pub fn trailing_averages(closes: &[f64], windows: &[u32]) -> Vec<f64> {
    windows
        .iter()
        .map(|&w| Sma::new(w.max(1) as usize).last(closes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn last_uses_trailing_window() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx(Sma::new(2).last(&closes), 4.5));
        assert!(approx(Sma::new(5).last(&closes), 3.0));
        assert!(Sma::new(6).last(&closes).is_nan());
    }

    #[test]
    fn nan_in_window_poisons_result() {
        let closes = [1.0, f64::NAN, 3.0, 4.0];
        assert!(Sma::new(3).last(&closes).is_nan());
        assert!(approx(Sma::new(2).last(&closes), 3.5));
    }

    #[test]
    fn averages_follow_window_order() {
        let closes = [2.0, 4.0, 6.0];
        let out = trailing_averages(&closes, &[1, 3, 4]);
        assert!(approx(out[0], 6.0));
        assert!(approx(out[1], 4.0));
        assert!(out[2].is_nan());
    }
}
