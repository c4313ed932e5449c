use clap::{Parser, ValueEnum};
use minibank::application::engine::Ledger;
use minibank::config::LedgerConfig;
use minibank::interfaces::commands::CommandProcessor;
use minibank::interfaces::csv::command_reader::CommandReader;
use minibank::interfaces::csv::report_writer::ReportWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Report {
    /// One row per account with its balance
    Accounts,
    /// Total balance per customer group
    Groups,
    /// Every loan with its repayment figures
    Loans,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report written to stdout once all commands have run
    #[arg(long, value_enum, default_value_t = Report::Accounts)]
    report: Report,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn build_ledger(db_path: Option<PathBuf>, config: LedgerConfig) -> Result<Ledger> {
    use minibank::infrastructure::rocksdb::RocksDBStore;
    use std::sync::Arc;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(&path).into_diagnostic()?;
            tracing::info!(path = %path.display(), "using RocksDB storage");
            Ok(Ledger::new(Arc::new(store.clone()), Arc::new(store), config))
        }
        None => Ok(Ledger::in_memory(config)),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_ledger(db_path: Option<PathBuf>, config: LedgerConfig) -> Result<Ledger> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
        );
    }
    Ok(Ledger::in_memory(config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => LedgerConfig::from_path(path).into_diagnostic()?,
        None => LedgerConfig::default(),
    };
    let ledger = build_ledger(cli.db_path, config)?;
    ledger.bootstrap().await.into_diagnostic()?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let mut processor = CommandProcessor::new(&ledger);
    for (row, record) in CommandReader::new(file).commands().enumerate() {
        // Header is line 1.
        let line = row + 2;
        match record {
            Ok(record) => {
                if let Err(e) = processor.apply(record).await {
                    error!(line, "Error processing command: {e}");
                }
            }
            Err(e) => error!(line, "Error reading command: {e}"),
        }
    }

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    match cli.report {
        Report::Accounts => {
            let accounts = ledger.accounts().await.into_diagnostic()?;
            writer.write_accounts(&accounts).into_diagnostic()?;
        }
        Report::Groups => {
            let totals = ledger.group_totals().await.into_diagnostic()?;
            writer.write_group_totals(&totals).into_diagnostic()?;
        }
        Report::Loans => {
            let rows = ledger.loan_report().await.into_diagnostic()?;
            writer.write_loans(&rows).into_diagnostic()?;
        }
    }

    Ok(())
}
