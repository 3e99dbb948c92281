//! Offline analysis of an evaluation log.
//!
//! Aggregates realized trades (sells and series-end liquidations) per
//! window, renders a best/worst summary, exports per-window CSV, and checks
//! the log against the persisted totals.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use smalab_core::state::{SessionState, StoreError};
use thiserror::Error;

/// Differences at or below this are treated as equal when reconciling.
pub const RECONCILE_TOLERANCE: f64 = 1e-6;

const PROFIT_PHRASE: &str = "for a profit of";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("cannot read log {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write csv {path}: {reason}")]
    Csv { path: PathBuf, reason: String },

    #[error("cannot load totals: {0}")]
    Totals(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeStats {
    pub trades: u32,
    pub total: f64,
    pub positive: u32,
}

impl TradeStats {
    fn add(&mut self, profit: f64) {
        self.trades += 1;
        self.total += profit;
        if profit > 0.0 {
            self.positive += 1;
        }
    }

    pub fn average(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.total / self.trades as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogAnalysis {
    pub per_window: BTreeMap<u32, TradeStats>,
    pub overall: TradeStats,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    sma: u32,
    trades: u32,
    total: String,
    avg: String,
    positive: u32,
}

/// One realized trade parsed from a log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealizedTrade {
    pub window: u32,
    pub profit: f64,
}

/// Parse a realized-trade line.
///
/// The exact ledger form is tried first; any other line containing
/// "for a profit of" is salvaged when a window and a number can be found.
pub fn parse_realized(line: &str) -> Option<RealizedTrade> {
    parse_strict(line).or_else(|| parse_permissive(line))
}

fn parse_strict(line: &str) -> Option<RealizedTrade> {
    let rest = line.trim().strip_prefix("SMA bot ")?;
    let (window, rest) = rest.split_once(' ')?;
    let window = window.parse().ok()?;
    let rest = rest
        .strip_prefix("sold at ")
        .or_else(|| rest.strip_prefix("liquidated at "))?;
    let (price, rest) = rest.split_once(' ')?;
    price.parse::<f64>().ok()?;
    let rest = rest.strip_prefix(PROFIT_PHRASE)?.trim_start();
    let (profit, _) = rest.split_once(". SMA:")?;
    let profit = profit.parse().ok()?;
    Some(RealizedTrade { window, profit })
}

fn parse_permissive(line: &str) -> Option<RealizedTrade> {
    let (head, tail) = line.split_once(PROFIT_PHRASE)?;
    let token = tail.split_whitespace().next()?;
    let profit: f64 = token.trim_end_matches(['.', ';', ',']).parse().ok()?;
    if !profit.is_finite() {
        return None;
    }
    let after_bot = head.split_once("SMA bot")?.1.trim_start();
    let digits: String = after_bot.chars().take_while(char::is_ascii_digit).collect();
    let window = digits.parse().ok()?;
    Some(RealizedTrade { window, profit })
}

impl LogAnalysis {
    pub fn from_text(text: &str) -> Self {
        let mut analysis = Self::default();
        for trade in text.lines().filter_map(parse_realized) {
            analysis
                .per_window
                .entry(trade.window)
                .or_default()
                .add(trade.profit);
            analysis.overall.add(trade.profit);
        }
        analysis
    }

    pub fn from_file(path: &Path) -> Result<Self, AnalyzeError> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_text(&text))
    }

    /// Windows ordered by total profit, worst first.
    pub fn ranked(&self) -> Vec<(u32, TradeStats)> {
        let mut ranked: Vec<_> = self.per_window.iter().map(|(w, s)| (*w, *s)).collect();
        ranked.sort_by(|a, b| a.1.total.total_cmp(&b.1.total).then(a.0.cmp(&b.0)));
        ranked
    }

    pub fn render(&self, top: usize) -> String {
        let mut out = String::new();
        let o = &self.overall;
        let _ = writeln!(out, "Realized trades: {}", o.trades);
        let _ = writeln!(out, "Overall total profit: {:.6}", o.total);
        let _ = writeln!(out, "Overall average profit per trade: {:.6}", o.average());
        let _ = writeln!(out, "Overall positive trades: {}", o.positive);

        let ranked = self.ranked();
        let line = |out: &mut String, (window, s): &(u32, TradeStats)| {
            let _ = writeln!(
                out,
                "  SMA {window}: trades={}, total={:.6}, avg={:.6}, positive={}",
                s.trades,
                s.total,
                s.average(),
                s.positive
            );
        };

        let _ = writeln!(out, "\nTop {top} worst SMAs (by total profit):");
        for entry in ranked.iter().take(top) {
            line(&mut out, entry);
        }
        let _ = writeln!(out, "\nTop {top} best SMAs (by total profit):");
        for entry in ranked.iter().rev().take(top) {
            line(&mut out, entry);
        }
        out
    }

    /// Per-window stats as CSV: `sma,trades,total,avg,positive`.
    pub fn write_csv(&self, path: &Path) -> Result<(), AnalyzeError> {
        let csv_err = |reason: String| AnalyzeError::Csv {
            path: path.to_path_buf(),
            reason,
        };
        let mut writer = csv::Writer::from_path(path).map_err(|e| csv_err(e.to_string()))?;
        for (window, s) in &self.per_window {
            writer
                .serialize(CsvRow {
                    sma: *window,
                    trades: s.trades,
                    total: format!("{:.6}", s.total),
                    avg: format!("{:.6}", s.average()),
                    positive: s.positive,
                })
                .map_err(|e| csv_err(e.to_string()))?;
        }
        writer.flush().map_err(|e| csv_err(e.to_string()))?;
        Ok(())
    }

    /// Compare logged profit with persisted totals.
    pub fn reconcile(&self, totals: &BTreeMap<u32, f64>) -> Vec<Discrepancy> {
        let mut found = Vec::new();
        for (&window, &persisted) in totals {
            let Some(stats) = self.per_window.get(&window) else {
                if persisted.abs() > RECONCILE_TOLERANCE {
                    found.push(Discrepancy {
                        window,
                        kind: DiscrepancyKind::PersistedOnly,
                        persisted,
                        logged: 0.0,
                    });
                }
                continue;
            };
            let logged = stats.total;
            let kind = if (logged < 0.0 && persisted >= 0.0) || (logged > 0.0 && persisted <= 0.0)
            {
                if (logged - persisted).abs() <= RECONCILE_TOLERANCE {
                    continue;
                }
                DiscrepancyKind::SignMismatch
            } else if (logged - persisted).abs() > RECONCILE_TOLERANCE {
                DiscrepancyKind::ValueMismatch
            } else {
                continue;
            };
            found.push(Discrepancy {
                window,
                kind,
                persisted,
                logged,
            });
        }
        for (&window, stats) in &self.per_window {
            if !totals.contains_key(&window) {
                found.push(Discrepancy {
                    window,
                    kind: DiscrepancyKind::LoggedOnly,
                    persisted: 0.0,
                    logged: stats.total,
                });
            }
        }
        found.sort_by_key(|d| d.window);
        found
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscrepancyKind {
    PersistedOnly,
    LoggedOnly,
    SignMismatch,
    ValueMismatch,
}

impl DiscrepancyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscrepancyKind::PersistedOnly => "persisted_only",
            DiscrepancyKind::LoggedOnly => "logged_only",
            DiscrepancyKind::SignMismatch => "sign_mismatch",
            DiscrepancyKind::ValueMismatch => "value_mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discrepancy {
    pub window: u32,
    pub kind: DiscrepancyKind,
    pub persisted: f64,
    pub logged: f64,
}

pub fn render_discrepancies(found: &[Discrepancy]) -> String {
    let mut out = String::from("\nComparing logged profit to persisted totals...\n");
    if found.is_empty() {
        out.push_str("No discrepancies found.\n");
        return out;
    }
    let _ = writeln!(out, "Found {} discrepancies:", found.len());
    for d in found {
        let _ = writeln!(
            out,
            "  SMA {}: {} -> persisted={:.6}, logged={:.6}",
            d.window,
            d.kind.as_str(),
            d.persisted,
            d.logged
        );
    }
    out
}

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub log_path: PathBuf,
    pub top: usize,
    pub csv_out: Option<PathBuf>,
    /// Persisted state to reconcile against.
    pub totals_from: Option<SessionState>,
}

/// Run a full analysis and return the printable report.
pub fn analyze(options: &AnalyzeOptions) -> Result<String, AnalyzeError> {
    let analysis = LogAnalysis::from_file(&options.log_path)?;
    let mut report = analysis.render(options.top);

    if let Some(path) = &options.csv_out {
        analysis.write_csv(path)?;
        let _ = writeln!(report, "\nWrote CSV to {}", path.display());
    }

    if let Some(state) = &options.totals_from {
        let found = analysis.reconcile(&state.totals);
        if !found.is_empty() {
            tracing::warn!(count = found.len(), "log and persisted totals disagree");
        }
        report.push_str(&render_discrepancies(&found));
    }
    Ok(report)
}
