//! Trade mode policy and the fixed trading rules shared by every strategy.

use serde::{Deserialize, Serialize};

/// How a strategy reads the gap between price and its moving average.
///
/// Chosen once per session and applied uniformly to all strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TradeMode {
    /// Buy strength above the average, sell weakness below it.
    Momentum,
    /// Buy dips below the average, sell rallies above it.
    #[default]
    MeanReversion,
}

impl TradeMode {
    /// Entry condition for a flat strategy.
    pub fn should_buy(self, price: f64, average: f64, threshold: f64) -> bool {
        match self {
            TradeMode::Momentum => average + threshold < price,
            TradeMode::MeanReversion => price + threshold < average,
        }
    }

    /// Exit condition for a holding strategy.
    pub fn should_sell(self, price: f64, average: f64, threshold: f64) -> bool {
        match self {
            TradeMode::Momentum => average > price + threshold,
            TradeMode::MeanReversion => price > average + threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeMode::Momentum => "momentum",
            TradeMode::MeanReversion => "mean_reversion",
        }
    }
}

impl std::fmt::Display for TradeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds, fee and downtime shared by all strategies in a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingRules {
    pub mode: TradeMode,
    /// Distance past the average required to buy.
    pub buy_threshold: f64,
    /// Distance past the average required to sell.
    pub sell_threshold: f64,
    /// Fee charged once per round trip, deducted on the sell.
    pub fee: f64,
    /// Day rollovers a strategy sits out after selling.
    pub downtime_days: u32,
}

impl Default for TradingRules {
    fn default() -> Self {
        Self {
            mode: TradeMode::MeanReversion,
            buy_threshold: 1.0,
            sell_threshold: 1.0,
            fee: 0.1,
            downtime_days: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_buys_above_and_sells_below() {
        let mode = TradeMode::Momentum;
        assert!(mode.should_buy(101.5, 100.0, 1.0));
        assert!(!mode.should_buy(101.0, 100.0, 1.0));
        assert!(mode.should_sell(98.5, 100.0, 1.0));
        assert!(!mode.should_sell(99.0, 100.0, 1.0));
    }

    #[test]
    fn mean_reversion_buys_below_and_sells_above() {
        let mode = TradeMode::MeanReversion;
        assert!(mode.should_buy(98.5, 100.0, 1.0));
        assert!(!mode.should_buy(99.0, 100.0, 1.0));
        assert!(mode.should_sell(101.5, 100.0, 1.0));
        assert!(!mode.should_sell(101.0, 100.0, 1.0));
    }

    #[test]
    fn nan_average_never_triggers() {
        for mode in [TradeMode::Momentum, TradeMode::MeanReversion] {
            assert!(!mode.should_buy(100.0, f64::NAN, 1.0));
            assert!(!mode.should_sell(100.0, f64::NAN, 1.0));
        }
    }

    #[test]
    fn mode_roundtrips_as_snake_case() {
        let json = serde_json::to_string(&TradeMode::MeanReversion).unwrap();
        assert_eq!(json, "\"mean_reversion\"");
        let mode: TradeMode = serde_json::from_str("\"momentum\"").unwrap();
        assert_eq!(mode, TradeMode::Momentum);
    }
}
