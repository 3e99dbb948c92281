//! smalab runner: session orchestration on top of `smalab-core`.
//!
//! This crate provides:
//! - A JSON file state store with atomic writes and a session marker
//! - The human-readable evaluation ledger
//! - Session bootstrap (new, resume, clean) over a frozen market snapshot
//! - Offline analysis of evaluation logs

pub mod analyze;
pub mod config;
pub mod file_store;
pub mod logging;
pub mod paths;
pub mod runner;
pub mod session;
pub mod text_ledger;

pub use analyze::{analyze, AnalyzeError, AnalyzeOptions, Discrepancy, DiscrepancyKind, LogAnalysis};
pub use config::{load_config, parse_config, save_config, ConfigLoadError};
pub use file_store::JsonFileStore;
pub use paths::SessionPaths;
pub use runner::{build_engine, run_session, RunError, SessionEngine};
pub use session::{clean, resume, start_new, NewSessionOptions, Session, SessionError, SourceKind};
pub use text_ledger::TextLedger;
