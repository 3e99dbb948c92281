//! Indicators computed from daily closes.

pub mod sma;

pub use sma::{trailing_averages, Sma};
