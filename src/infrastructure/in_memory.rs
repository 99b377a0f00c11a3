use crate::domain::branch::BranchRecord;
use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{BranchDirectory, CommitOutcome, WalletCommit, WalletStore};
use crate::domain::wallet::WalletAccount;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory branch catalogue.
#[derive(Default, Clone)]
pub struct InMemoryBranchDirectory {
    branches: Arc<RwLock<HashMap<String, BranchRecord>>>,
}

impl InMemoryBranchDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = BranchRecord>) -> Self {
        let branches = records
            .into_iter()
            .map(|record| (record.branch_id.clone(), record))
            .collect();
        Self {
            branches: Arc::new(RwLock::new(branches)),
        }
    }

    pub async fn insert(&self, record: BranchRecord) {
        let mut branches = self.branches.write().await;
        branches.insert(record.branch_id.clone(), record);
    }
}

#[async_trait]
impl BranchDirectory for InMemoryBranchDirectory {
    async fn branch(&self, branch_id: &str) -> Result<Option<BranchRecord>> {
        let branches = self.branches.read().await;
        Ok(branches.get(branch_id).cloned())
    }
}

#[derive(Default)]
struct Tables {
    wallets: HashMap<String, WalletAccount>,
    /// Keyed by ledger id, which keeps per-branch listings in id order.
    ledger: BTreeMap<String, LedgerEntry>,
    /// Idempotency key to ledger id.
    idempotency: HashMap<String, String>,
    ledger_sequence: u64,
}

impl Tables {
    fn entry_for_key(&self, key: &str) -> Option<&LedgerEntry> {
        self.idempotency
            .get(key)
            .and_then(|ledger_id| self.ledger.get(ledger_id))
    }
}

/// A thread-safe in-memory wallet and ledger store.
///
/// Every `commit` runs inside a single write-lock critical section, which gives
/// it the same all-or-nothing behaviour as a database transaction.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn wallet(&self, branch_id: &str) -> Result<Option<WalletAccount>> {
        let tables = self.tables.read().await;
        Ok(tables.wallets.get(branch_id).cloned())
    }

    async fn wallets(&self) -> Result<Vec<WalletAccount>> {
        let tables = self.tables.read().await;
        let mut wallets: Vec<_> = tables.wallets.values().cloned().collect();
        wallets.sort_by(|a, b| a.branch_id.cmp(&b.branch_id));
        Ok(wallets)
    }

    async fn entry_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.entry_for_key(key).cloned())
    }

    async fn ledger_for_branch(&self, branch_id: &str) -> Result<Vec<LedgerEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ledger
            .values()
            .filter(|entry| entry.branch_id == branch_id)
            .cloned()
            .collect())
    }

    async fn next_ledger_sequence(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.ledger_sequence += 1;
        Ok(tables.ledger_sequence)
    }

    async fn commit(&self, commit: WalletCommit) -> Result<CommitOutcome> {
        let mut tables = self.tables.write().await;

        if let Some(entry) = &commit.entry
            && let Some(existing) = tables.entry_for_key(&entry.idempotency_key)
        {
            return Ok(CommitOutcome::DuplicateKey(existing.clone()));
        }

        let actual = tables
            .wallets
            .get(&commit.wallet.branch_id)
            .map_or(0, |stored| stored.version);
        if actual != commit.wallet.version {
            return Ok(CommitOutcome::VersionConflict {
                expected: commit.wallet.version,
                actual,
            });
        }

        let mut wallet = commit.wallet;
        wallet.version += 1;
        tables
            .wallets
            .insert(wallet.branch_id.clone(), wallet.clone());
        if let Some(entry) = commit.entry {
            tables
                .idempotency
                .insert(entry.idempotency_key.clone(), entry.ledger_id.clone());
            tables.ledger.insert(entry.ledger_id.clone(), entry);
        }
        Ok(CommitOutcome::Committed(wallet))
    }
}
