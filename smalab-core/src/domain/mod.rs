//! Domain types for SMA Lab

pub mod position;
pub mod rules;
pub mod strategy;

pub use position::Position;
pub use rules::{TradeMode, TradingRules};
pub use strategy::{Strategy, StrategySnapshot, TradeAction};
