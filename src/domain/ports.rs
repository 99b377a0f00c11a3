use super::branch::BranchRecord;
use super::ledger::LedgerEntry;
use super::wallet::WalletAccount;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read access to the branch catalogue (fee configuration and ownership).
#[async_trait]
pub trait BranchDirectory: Send + Sync {
    async fn branch(&self, branch_id: &str) -> Result<Option<BranchRecord>>;
}

/// A wallet write, optionally paired with the ledger entry that caused it.
///
/// `wallet.version` carries the version the caller read; a wallet that did not
/// exist yet is written with version 0.
#[derive(Debug, Clone)]
pub struct WalletCommit {
    pub wallet: WalletAccount,
    pub entry: Option<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Both records were written. Carries the wallet as stored.
    Committed(WalletAccount),
    /// The wallet changed since it was read. Nothing was written.
    VersionConflict { expected: u64, actual: u64 },
    /// The entry's idempotency key is taken. Nothing was written.
    DuplicateKey(LedgerEntry),
}

/// Transactional store for wallets and the ledger.
///
/// `commit` is all-or-nothing: the idempotency check, the version check and
/// both writes happen as one atomic unit.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn wallet(&self, branch_id: &str) -> Result<Option<WalletAccount>>;
    async fn wallets(&self) -> Result<Vec<WalletAccount>>;
    async fn entry_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>>;
    /// Entries for a branch, ordered by ledger id.
    async fn ledger_for_branch(&self, branch_id: &str) -> Result<Vec<LedgerEntry>>;
    /// Atomically increments and returns the ledger sequence. Never repeats.
    async fn next_ledger_sequence(&self) -> Result<u64>;
    async fn commit(&self, commit: WalletCommit) -> Result<CommitOutcome>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type BranchDirectoryBox = Box<dyn BranchDirectory>;
pub type WalletStoreBox = Box<dyn WalletStore>;
pub type ClockBox = Box<dyn Clock>;
