use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{CommitOutcome, WalletCommit, WalletStore};
use crate::domain::wallet::WalletAccount;
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, TransactionDB,
    TransactionDBOptions,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Column Family for wallet accounts, keyed by branch id.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for ledger entries, keyed by ledger id.
pub const CF_LEDGER: &str = "ledger";
/// Column Family mapping idempotency keys to ledger ids.
pub const CF_IDEMPOTENCY: &str = "idempotency";
/// Column Family indexing ledger ids per branch (`branch_id \0 ledger_id`).
pub const CF_LEDGER_BY_BRANCH: &str = "ledger_by_branch";
/// Column Family for counters.
pub const CF_META: &str = "meta";

const LEDGER_SEQUENCE_KEY: &[u8] = b"ledger_sequence";

/// A persistent store implementation using a RocksDB `TransactionDB`.
///
/// Commits run in a pessimistic transaction: the wallet row and the
/// idempotency key are read with `get_for_update`, so a concurrent writer on the
/// same wallet blocks (up to the lock timeout) instead of overwriting.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a database at `path` with every column family in place.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [
            CF_WALLETS,
            CF_LEDGER,
            CF_IDEMPOTENCY,
            CF_LEDGER_BY_BRANCH,
            CF_META,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &TransactionDBOptions::default(),
            path.as_ref(),
            cfs,
        )?;
        info!(path = %path.as_ref().display(), "opened RocksDB wallet store");

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| WalletError::StoreError(format!("{} column family not found", name)))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_entry(&self, ledger_id: &[u8]) -> Result<Option<LedgerEntry>> {
        self.get_json(CF_LEDGER, ledger_id)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn branch_index_key(branch_id: &str, ledger_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(branch_id.len() + ledger_id.len() + 1);
    key.extend_from_slice(branch_id.as_bytes());
    key.push(0);
    key.extend_from_slice(ledger_id.as_bytes());
    key
}

#[async_trait]
impl WalletStore for RocksDBStore {
    async fn wallet(&self, branch_id: &str) -> Result<Option<WalletAccount>> {
        self.get_json(CF_WALLETS, branch_id.as_bytes())
    }

    async fn wallets(&self) -> Result<Vec<WalletAccount>> {
        let cf = self.cf(CF_WALLETS)?;
        let mut wallets = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            wallets.push(serde_json::from_slice(&value)?);
        }
        Ok(wallets)
    }

    async fn entry_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>> {
        let cf = self.cf(CF_IDEMPOTENCY)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(ledger_id) => self.get_entry(&ledger_id),
            None => Ok(None),
        }
    }

    async fn ledger_for_branch(&self, branch_id: &str) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf(CF_LEDGER_BY_BRANCH)?;
        let prefix = branch_index_key(branch_id, "");
        let mut entries = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_slice(), rocksdb::Direction::Forward),
        );
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if let Some(entry) = self.get_entry(&key[prefix.len()..])? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn next_ledger_sequence(&self) -> Result<u64> {
        let cf = self.cf(CF_META)?;
        let txn = self.db.transaction();
        let current = match txn.get_for_update_cf(cf, LEDGER_SEQUENCE_KEY, true)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    WalletError::StoreError("corrupt ledger sequence counter".to_string())
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        txn.put_cf(cf, LEDGER_SEQUENCE_KEY, next.to_be_bytes())?;
        txn.commit()?;
        Ok(next)
    }

    async fn commit(&self, commit: WalletCommit) -> Result<CommitOutcome> {
        let wallets = self.cf(CF_WALLETS)?;
        let idempotency = self.cf(CF_IDEMPOTENCY)?;
        let txn = self.db.transaction();

        if let Some(entry) = &commit.entry
            && let Some(ledger_id) =
                txn.get_for_update_cf(idempotency, entry.idempotency_key.as_bytes(), true)?
        {
            txn.rollback()?;
            return match self.get_entry(&ledger_id)? {
                Some(existing) => Ok(CommitOutcome::DuplicateKey(existing)),
                None => Err(WalletError::StoreError(format!(
                    "idempotency key {} points at missing ledger entry",
                    entry.idempotency_key
                ))),
            };
        }

        let branch_key = commit.wallet.branch_id.as_bytes().to_vec();
        let actual = match txn.get_for_update_cf(wallets, &branch_key, true)? {
            Some(bytes) => serde_json::from_slice::<WalletAccount>(&bytes)?.version,
            None => 0,
        };
        if actual != commit.wallet.version {
            txn.rollback()?;
            return Ok(CommitOutcome::VersionConflict {
                expected: commit.wallet.version,
                actual,
            });
        }

        let mut wallet = commit.wallet;
        wallet.version += 1;
        txn.put_cf(wallets, &branch_key, to_json(&wallet)?)?;

        if let Some(entry) = &commit.entry {
            let ledger = self.cf(CF_LEDGER)?;
            let by_branch = self.cf(CF_LEDGER_BY_BRANCH)?;
            txn.put_cf(ledger, entry.ledger_id.as_bytes(), to_json(entry)?)?;
            txn.put_cf(
                idempotency,
                entry.idempotency_key.as_bytes(),
                entry.ledger_id.as_bytes(),
            )?;
            txn.put_cf(
                by_branch,
                branch_index_key(&entry.branch_id, &entry.ledger_id),
                b"",
            )?;
        }

        txn.commit()?;
        Ok(CommitOutcome::Committed(wallet))
    }
}
