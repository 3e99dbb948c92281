//! Human-readable evaluation log.
//!
//! Appends one line per event to `{SYMBOL}_EvaluationLog.txt`. Numbers are
//! written with their shortest exact representation so the log can be summed
//! back to the persisted totals.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use smalab_core::ledger::{Ledger, LedgerError, TradeEvent, TradeKind};

/// Written once each time a ledger is opened.
pub const RUN_SEPARATOR: &str = "---------------------------------";

pub fn format_trade(event: &TradeEvent) -> String {
    let TradeEvent {
        window,
        price,
        average,
        ..
    } = *event;
    let profit = event.profit.unwrap_or(0.0);
    match event.kind {
        TradeKind::Buy => format!("SMA bot {window} bought at {price}. SMA: {average}."),
        TradeKind::Sell => format!(
            "SMA bot {window} sold at {price} for a profit of {profit}. SMA: {average}."
        ),
        TradeKind::Liquidation => format!(
            "SMA bot {window} liquidated at {price} for a profit of {profit}. SMA: {average}."
        ),
    }
}

pub fn format_day_summary(window: u32, cumulative_profit: f64) -> String {
    format!("SMA {window} finished today with {cumulative_profit} in profit.")
}

pub struct TextLedger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TextLedger {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut ledger = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        ledger.line(RUN_SEPARATOR)?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Flush per line; the log must not lag the persisted state.
    fn line(&mut self, text: &str) -> Result<(), LedgerError> {
        writeln!(self.writer, "{text}")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl Ledger for TextLedger {
    fn record_day_start(&mut self, day: u32) -> Result<(), LedgerError> {
        self.line(&format!("Day {day}"))
    }

    fn record_trade(&mut self, event: &TradeEvent) -> Result<(), LedgerError> {
        self.line(&format_trade(event))
    }

    fn record_price(&mut self, tick: u32, price: f64) -> Result<(), LedgerError> {
        self.line(&format!("Price: {price}"))?;
        self.line(&format!("Price Index: {tick}"))
    }

    fn record_day_summary(
        &mut self,
        window: u32,
        cumulative_profit: f64,
    ) -> Result<(), LedgerError> {
        self.line(&format_day_summary(window, cumulative_profit))
    }

    fn record_completion(&mut self) -> Result<(), LedgerError> {
        self.line("Evaluation Complete!")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: TradeKind, price: f64, profit: Option<f64>) -> TradeEvent {
        TradeEvent {
            window: 5,
            kind,
            price,
            profit,
            average: 100.0,
        }
    }

    #[test]
    fn trade_lines() {
        assert_eq!(
            format_trade(&event(TradeKind::Buy, 98.0, None)),
            "SMA bot 5 bought at 98. SMA: 100."
        );
        assert_eq!(
            format_trade(&event(TradeKind::Sell, 102.5, Some(4.4))),
            "SMA bot 5 sold at 102.5 for a profit of 4.4. SMA: 100."
        );
        assert_eq!(
            format_trade(&event(TradeKind::Liquidation, 97.0, Some(-1.1))),
            "SMA bot 5 liquidated at 97 for a profit of -1.1. SMA: 100."
        );
    }

    #[test]
    fn appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("T_EvaluationLog.txt");
        {
            let mut ledger = TextLedger::open(&path).unwrap();
            ledger.record_day_start(1).unwrap();
            ledger.record_price(100, 98.25).unwrap();
            ledger.record_day_summary(5, 3.9).unwrap();
        }
        {
            let mut ledger = TextLedger::open(&path).unwrap();
            ledger.record_completion().unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                RUN_SEPARATOR,
                "Day 1",
                "Price: 98.25",
                "Price Index: 100",
                "SMA 5 finished today with 3.9 in profit.",
                RUN_SEPARATOR,
                "Evaluation Complete!",
            ]
        );
    }
}
