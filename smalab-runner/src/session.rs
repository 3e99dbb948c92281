//! Session bootstrap: start, resume and clean evaluation sessions.
//!
//! Starting a session resolves data once and freezes it into the session
//! directory. Resuming never touches a provider: it replays the frozen
//! snapshot, so a restarted run sees the same prices.
//!
//! Layout of a session directory:
//! - `SESSION`: symbol of the active session
//! - `{SYMBOL}_State.json`: persisted engine state
//! - `{SYMBOL}_Config.toml`: configuration the session was started with
//! - `{SYMBOL}_intraday.csv`, `{SYMBOL}_daily.csv`: the frozen snapshot
//! - `{SYMBOL}_EvaluationLog.txt`: the trade ledger

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use smalab_core::config::SimConfig;
use smalab_core::data::{
    CircuitBreaker, CsvProvider, DataError, DataProvider, MarketSnapshot, SyntheticProvider,
    YahooProvider,
};
use smalab_core::state::{SessionState, StateStore, StoreError};

use crate::config::{load_config, save_config, ConfigLoadError};
use crate::file_store::{
    read_session_marker, remove_if_present, write_session_marker, JsonFileStore,
};
use crate::paths::SessionPaths;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error("market data: {0}")]
    Data(#[from] DataError),

    #[error("session state: {0}")]
    Store(#[from] StoreError),

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no active session in {0} (start one with `smalab new`)")]
    NoActiveSession(PathBuf),

    #[error("the csv source needs --csv-dir")]
    MissingCsvDir,

    #[error("data provider '{0}' is not available")]
    ProviderUnavailable(String),

    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),
}

/// Where a new session gets its market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Yahoo => "yahoo",
            SourceKind::Csv => "csv",
            SourceKind::Synthetic => "synthetic",
        })
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yahoo" => Ok(SourceKind::Yahoo),
            "csv" => Ok(SourceKind::Csv),
            "synthetic" => Ok(SourceKind::Synthetic),
            other => Err(format!("unknown data source '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSessionOptions {
    pub symbol: String,
    pub session_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub source: SourceKind,
    pub csv_dir: Option<PathBuf>,
}

/// Everything needed to run a session.
#[derive(Debug, Clone)]
pub struct Session {
    pub paths: SessionPaths,
    pub config: SimConfig,
    pub snapshot: MarketSnapshot,
}

fn io_err(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> SessionError {
    let path = path.to_path_buf();
    move |source| SessionError::Io {
        action,
        path,
        source,
    }
}

pub fn normalize_symbol(symbol: &str) -> Result<String, SessionError> {
    let symbol = symbol.trim().to_ascii_uppercase();
    let valid = !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(symbol)
    } else {
        Err(SessionError::InvalidSymbol(symbol))
    }
}

fn provider_for(options: &NewSessionOptions) -> Result<Box<dyn DataProvider>, SessionError> {
    let provider: Box<dyn DataProvider> = match options.source {
        SourceKind::Yahoo => Box::new(YahooProvider::new(Arc::new(
            CircuitBreaker::default_provider(),
        ))?),
        SourceKind::Csv => {
            let dir = options.csv_dir.as_ref().ok_or(SessionError::MissingCsvDir)?;
            Box::new(CsvProvider::new(dir))
        }
        SourceKind::Synthetic => Box::new(SyntheticProvider::new()),
    };
    if !provider.is_available() {
        return Err(SessionError::ProviderUnavailable(provider.name().to_string()));
    }
    Ok(provider)
}

/// Start a new session, replacing any previous one for the same symbol.
pub fn start_new(options: &NewSessionOptions, today: NaiveDate) -> Result<Session, SessionError> {
    let symbol = normalize_symbol(&options.symbol)?;
    let config = load_config(options.config_path.as_deref())?;
    let provider = provider_for(options)?;
    let snapshot = MarketSnapshot::fetch(provider.as_ref(), &symbol, &config.evaluation, today)?;
    start_with_snapshot(&options.session_dir, config, snapshot)
}

/// Start a session from data already in hand.
pub fn start_with_snapshot(
    session_dir: &Path,
    config: SimConfig,
    snapshot: MarketSnapshot,
) -> Result<Session, SessionError> {
    fs::create_dir_all(session_dir).map_err(io_err("cannot create", session_dir))?;
    let paths = SessionPaths::new(session_dir, snapshot.symbol.clone());

    remove_if_present(&paths.evaluation_log())
        .map_err(io_err("cannot remove", &paths.evaluation_log()))?;
    snapshot.write_csv(session_dir)?;
    save_config(&config, &paths.config())?;

    let mut store = JsonFileStore::new(paths.clone());
    store.save(&SessionState::fresh(&snapshot.symbol, config.config_hash()))?;
    write_session_marker(session_dir, &snapshot.symbol)
        .map_err(io_err("cannot write", &paths.marker()))?;

    tracing::info!(
        symbol = %snapshot.symbol,
        source = %snapshot.source,
        days = snapshot.total_days(),
        closes = snapshot.closes.len(),
        dataset_hash = %snapshot.dataset_hash(),
        dir = %session_dir.display(),
        "session started"
    );
    Ok(Session {
        paths,
        config,
        snapshot,
    })
}

/// Resume the session named by the marker in `session_dir`.
///
/// `config_override` replaces the stored configuration; the engine will
/// still refuse it if its hash differs from the one in the state.
pub fn resume(session_dir: &Path, config_override: Option<&Path>) -> Result<Session, SessionError> {
    let symbol = read_session_marker(session_dir)
        .map_err(io_err("cannot read", &session_dir.join(crate::paths::MARKER_FILE)))?
        .ok_or_else(|| SessionError::NoActiveSession(session_dir.to_path_buf()))?;
    let paths = SessionPaths::new(session_dir, symbol);

    let stored = paths.config();
    let config = match config_override {
        Some(path) => load_config(Some(path))?,
        None if stored.is_file() => load_config(Some(&stored))?,
        None => load_config(None)?,
    };
    let snapshot = MarketSnapshot::read_csv(session_dir, paths.symbol())?;

    tracing::info!(
        symbol = %paths.symbol(),
        days = snapshot.total_days(),
        dataset_hash = %snapshot.dataset_hash(),
        "session resumed"
    );
    Ok(Session {
        paths,
        config,
        snapshot,
    })
}

/// Delete every file of `symbol`'s session. Returns the removed paths.
pub fn clean(session_dir: &Path, symbol: &str) -> Result<Vec<PathBuf>, SessionError> {
    let symbol = normalize_symbol(symbol)?;
    let paths = SessionPaths::new(session_dir, symbol.clone());

    let mut removed = Vec::new();
    for path in paths.session_files() {
        if remove_if_present(&path).map_err(io_err("cannot remove", &path))? {
            removed.push(path);
        }
    }

    let marker = paths.marker();
    let active = read_session_marker(session_dir).map_err(io_err("cannot read", &marker))?;
    if active.as_deref() == Some(symbol.as_str())
        && remove_if_present(&marker).map_err(io_err("cannot remove", &marker))?
    {
        removed.push(marker);
    }

    tracing::info!(symbol = %symbol, removed = removed.len(), "session cleaned");
    Ok(removed)
}
