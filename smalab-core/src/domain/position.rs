use serde::{Deserialize, Serialize};

/// Position held by a single SMA strategy.
///
/// The entry price only exists while holding, so "flat with an entry price"
/// cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Position {
    #[default]
    Flat,
    Holding { entry_price: f64 },
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn is_holding(&self) -> bool {
        matches!(self, Position::Holding { .. })
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self {
            Position::Flat => None,
            Position::Holding { entry_price } => Some(*entry_price),
        }
    }

    /// Profit of closing at `exit_price` after paying `fee`. `None` when flat.
    pub fn realized_pnl(&self, exit_price: f64, fee: f64) -> Option<f64> {
        self.entry_price()
            .map(|entry| (exit_price - entry) - fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_has_no_entry_price() {
        let pos = Position::Flat;
        assert!(pos.is_flat());
        assert_eq!(pos.entry_price(), None);
        assert_eq!(pos.realized_pnl(100.0, 0.1), None);
    }

    #[test]
    fn holding_realizes_price_difference_minus_fee() {
        let pos = Position::Holding { entry_price: 97.0 };
        assert!(pos.is_holding());
        let pnl = pos.realized_pnl(102.0, 0.1).unwrap();
        assert!((pnl - 4.9).abs() < 1e-12);
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_string(&Position::Holding { entry_price: 10.5 }).unwrap();
        assert_eq!(json, r#"{"state":"holding","entry_price":10.5}"#);
        let flat: Position = serde_json::from_str(r#"{"state":"flat"}"#).unwrap();
        assert_eq!(flat, Position::Flat);
    }
}
