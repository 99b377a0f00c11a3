use clap::Parser;
use miette::{IntoDiagnostic, Result};
use orderwallet::application::engine::WalletEngine;
use orderwallet::bootstrap::init_tracing;
use orderwallet::config::EngineConfig;
use orderwallet::domain::ports::{Clock, WalletStoreBox};
use orderwallet::domain::wallet::ConsumePriority;
use orderwallet::infrastructure::clock::SystemClock;
use orderwallet::infrastructure::in_memory::{InMemoryBranchDirectory, InMemoryWalletStore};
use orderwallet::interfaces::csv::branch_reader::read_branches;
use orderwallet::interfaces::csv::event_reader::{EventReader, WalletCommand};
use orderwallet::interfaces::csv::ledger_writer::LedgerWriter;
use orderwallet::interfaces::csv::wallet_writer::WalletWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Wallet events CSV file (top-ups and order debits)
    input: PathBuf,

    /// Branch catalogue CSV file (branch,vendor,fee)
    #[arg(long)]
    branches: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Also write every touched wallet's ledger to this CSV file.
    #[arg(long)]
    ledger_out: Option<PathBuf>,

    /// JSON file with engine settings. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, env = "ORDERWALLET_CURRENCY")]
    currency: Option<String>,

    #[arg(long, env = "ORDERWALLET_BONUS_PERCENT")]
    bonus_percent: Option<i64>,

    #[arg(long, env = "ORDERWALLET_GRACE_DAYS")]
    grace_days: Option<u32>,

    /// bonus_first or paid_first, for wallets opened by a top-up
    #[arg(long, env = "ORDERWALLET_CONSUME_PRIORITY")]
    consume_priority: Option<ConsumePriority>,

    #[arg(long, env = "ORDERWALLET_MAX_COMMIT_RETRIES")]
    max_commit_retries: Option<u32>,
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file = File::open(path).into_diagnostic()?;
                serde_json::from_reader::<_, EngineConfig>(file).into_diagnostic()?
            }
            None => EngineConfig::default(),
        };
        if let Some(currency) = &self.currency {
            config.currency = currency.clone();
        }
        if let Some(bonus_percent) = self.bonus_percent {
            config.bonus_percent = bonus_percent;
        }
        if let Some(grace_days) = self.grace_days {
            config.grace_days_after_exhausted = grace_days;
        }
        if let Some(priority) = self.consume_priority {
            config.default_consume_priority = priority;
        }
        if let Some(retries) = self.max_commit_retries {
            config.max_commit_retries = retries;
        }
        Ok(config)
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<WalletStoreBox> {
    use orderwallet::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryWalletStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<WalletStoreBox> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryWalletStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.engine_config()?;
    debug!(?config, "engine configured");

    let branches = read_branches(File::open(&cli.branches).into_diagnostic()?).into_diagnostic()?;
    let directory = InMemoryBranchDirectory::from_records(branches);
    let store = open_store(cli.db_path.clone())?;
    let engine = WalletEngine::new(Box::new(directory), store, Box::new(SystemClock), config);

    let file = File::open(&cli.input).into_diagnostic()?;
    for (index, command) in EventReader::new(file).commands().enumerate() {
        let row = index + 1;
        let result = match command {
            Ok(WalletCommand::Debit(request)) => engine.debit(&request).await,
            Ok(WalletCommand::Topup(request)) => engine.topup(&request).await,
            Err(e) => {
                eprintln!("Error reading event {}: {}", row, e);
                continue;
            }
        };
        match result {
            Ok(receipt) => debug!(
                row,
                outcome = ?receipt.outcome,
                ledger_id = %receipt.ledger_entry.ledger_id,
                "event applied"
            ),
            Err(e) => eprintln!("Error processing event {}: {} {}", row, e.code(), e),
        }
    }

    let wallets = engine.wallets().await.into_diagnostic()?;

    if let Some(path) = &cli.ledger_out {
        let mut entries = Vec::new();
        for wallet in &wallets {
            entries.extend(engine.ledger(&wallet.branch_id).await.into_diagnostic()?);
        }
        let file = File::create(path).into_diagnostic()?;
        LedgerWriter::new(file)
            .write_entries(&entries)
            .into_diagnostic()?;
    }

    let stdout = io::stdout();
    let mut writer = WalletWriter::new(stdout.lock());
    writer
        .write_wallets(&wallets, SystemClock.now())
        .into_diagnostic()?;

    Ok(())
}
