//! File layout of a session directory.

use std::path::{Path, PathBuf};

use smalab_core::data::MarketSnapshot;

/// Name of the active-session marker file.
pub const MARKER_FILE: &str = "SESSION";
/// Diagnostic log written by the tracing subscriber.
pub const DEBUG_LOG_FILE: &str = "debug.log";

/// Paths for one symbol inside a session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    dir: PathBuf,
    symbol: String,
}

impl SessionPaths {
    pub fn new(dir: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            symbol: symbol.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> PathBuf {
        self.dir.join(format!("{}_State.json", self.symbol))
    }

    pub fn evaluation_log(&self) -> PathBuf {
        self.dir.join(format!("{}_EvaluationLog.txt", self.symbol))
    }

    /// Configuration the session was started with.
    pub fn config(&self) -> PathBuf {
        self.dir.join(format!("{}_Config.toml", self.symbol))
    }

    /// Per-window analysis written after each run.
    pub fn analysis_csv(&self) -> PathBuf {
        self.dir.join(format!("{}_Analysis.csv", self.symbol))
    }

    pub fn intraday(&self) -> PathBuf {
        MarketSnapshot::intraday_path(&self.dir, &self.symbol)
    }

    pub fn daily(&self) -> PathBuf {
        MarketSnapshot::daily_path(&self.dir, &self.symbol)
    }

    pub fn marker(&self) -> PathBuf {
        marker_path(&self.dir)
    }

    /// Every file owned by this symbol's session. The shared marker and
    /// debug log are not included.
    pub fn session_files(&self) -> Vec<PathBuf> {
        vec![
            self.state(),
            self.evaluation_log(),
            self.config(),
            self.analysis_csv(),
            self.intraday(),
            self.daily(),
        ]
    }
}

pub fn marker_path(dir: &Path) -> PathBuf {
    dir.join(MARKER_FILE)
}

pub fn debug_log_path(dir: &Path) -> PathBuf {
    dir.join(DEBUG_LOG_FILE)
}
