//! smalab CLI: run and inspect SMA strategy evaluations.
//!
//! Commands:
//! - `new` resolves market data, freezes it into the session directory and runs
//! - `resume` continues the active session from its persisted state
//! - `clean` removes a symbol's session files
//! - `analyze` summarizes an evaluation log

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use smalab_core::engine::RunSummary;
use smalab_core::state::StateStore;
use smalab_runner::paths::debug_log_path;
use smalab_runner::{
    analyze, clean, logging, resume, run_session, start_new, AnalyzeOptions, JsonFileStore,
    NewSessionOptions, Session, SessionPaths, SourceKind,
};

const DEFAULT_TOP: usize = 10;

#[derive(Parser)]
#[command(name = "smalab", about = "smalab: intraday SMA strategy evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new evaluation, replacing any previous session for the symbol.
    New {
        /// Ticker symbol (e.g., SPY).
        #[arg(long)]
        stock: String,

        /// Path to a TOML config file. Defaults to built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Market data source: yahoo, csv or synthetic.
        #[arg(long, default_value_t = SourceKind::Yahoo)]
        source: SourceKind,

        /// Directory holding intraday.csv and daily.csv (with --source csv).
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Session directory. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        session_dir: PathBuf,

        /// Skip the log summary after the run.
        #[arg(long, default_value_t = false)]
        no_analyze: bool,
    },
    /// Continue the active session.
    Resume {
        /// Config override. Must match the one the session was started with.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session directory. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        session_dir: PathBuf,

        /// Skip the log summary after the run.
        #[arg(long, default_value_t = false)]
        no_analyze: bool,
    },
    /// Delete a symbol's state, snapshot, config, analysis and evaluation log.
    Clean {
        /// Ticker symbol.
        #[arg(long)]
        stock: String,

        /// Session directory. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        session_dir: PathBuf,
    },
    /// Summarize realized profit per window from an evaluation log.
    Analyze {
        /// Ticker symbol.
        #[arg(long)]
        stock: String,

        /// Number of worst and best windows to list.
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,

        /// Write per-window stats to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Check logged profit against the persisted totals.
        #[arg(long, default_value_t = false)]
        compare_totals: bool,

        /// Session directory. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        session_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli.command) {
        let message = format!("{err:#}");
        tracing::error!(error = %message, "fatal");
        eprintln!("Error: {message}");
        std::process::exit(1);
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::New {
            stock,
            config,
            source,
            csv_dir,
            session_dir,
            no_analyze,
        } => {
            init_session_logging(&session_dir)?;
            let options = NewSessionOptions {
                symbol: stock,
                session_dir,
                config_path: config,
                source,
                csv_dir,
            };
            let today = chrono::Local::now().date_naive();
            let session = start_new(&options, today).context("failed to start session")?;
            run_and_report(&session, no_analyze)
        }
        Commands::Resume {
            config,
            session_dir,
            no_analyze,
        } => {
            init_session_logging(&session_dir)?;
            let session =
                resume(&session_dir, config.as_deref()).context("failed to resume session")?;
            run_and_report(&session, no_analyze)
        }
        Commands::Clean { stock, session_dir } => {
            logging::init_stderr();
            let removed = clean(&session_dir, &stock)?;
            if removed.is_empty() {
                println!("Nothing to clean for {stock}");
            }
            for path in removed {
                println!("Removed {}", path.display());
            }
            Ok(())
        }
        Commands::Analyze {
            stock,
            top,
            csv,
            compare_totals,
            session_dir,
        } => {
            logging::init_stderr();
            let symbol = smalab_runner::session::normalize_symbol(&stock)?;
            let paths = SessionPaths::new(&session_dir, symbol);
            print_analysis(&paths, top, csv, compare_totals)
        }
    }
}

fn init_session_logging(session_dir: &Path) -> Result<()> {
    if session_dir.exists() && !session_dir.is_dir() {
        bail!("{} is not a directory", session_dir.display());
    }
    logging::init_file(&debug_log_path(session_dir))
}

fn run_and_report(session: &Session, no_analyze: bool) -> Result<()> {
    let summary = run_session(session).context("evaluation failed")?;
    print_summary(session, &summary);
    if !no_analyze {
        let csv_out = session.paths.analysis_csv();
        print_analysis(&session.paths, DEFAULT_TOP, Some(csv_out), true)?;
    }
    Ok(())
}

fn print_summary(session: &Session, summary: &RunSummary) {
    println!("=== {} ===", session.paths.symbol());
    println!("Ticks:           {}", summary.ticks);
    println!("Malformed ticks: {}", summary.malformed_ticks);
    println!("Days rolled:     {}", summary.days_rolled);
    println!(
        "Trades:          {} buys, {} sells, {} liquidated",
        summary.buys, summary.sells, summary.liquidated
    );
    println!("Total profit:    {:.6}", summary.total_profit());
    if let Some((window, profit)) = summary.best_window() {
        println!("Best window:     SMA {window} ({profit:.6})");
    }
    println!("Log:             {}", session.paths.evaluation_log().display());
}

fn print_analysis(
    paths: &SessionPaths,
    top: usize,
    csv_out: Option<PathBuf>,
    compare_totals: bool,
) -> Result<()> {
    let totals_from = if compare_totals {
        let state = JsonFileStore::new(paths.clone())
            .load()
            .with_context(|| format!("cannot load {}", paths.state().display()))?;
        Some(state)
    } else {
        None
    };
    let options = AnalyzeOptions {
        log_path: paths.evaluation_log(),
        top,
        csv_out,
        totals_from,
    };
    let report = analyze(&options)?;
    print!("\n{report}");
    Ok(())
}
