use crate::application::fee_resolver::FeeResolver;
use crate::config::EngineConfig;
use crate::domain::ledger::{
    Actor, EntryContext, LedgerEntry, format_ledger_id, order_debit_key, topup_key,
};
use crate::domain::ports::{
    BranchDirectoryBox, ClockBox, CommitOutcome, WalletCommit, WalletStoreBox,
};
use crate::domain::topup::compute_topup;
use crate::domain::wallet::{ConsumePriority, WalletAccount, WalletState};
use crate::error::{Result, WalletError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Succeeded,
    Replayed,
}

/// An order asking to consume one credit.
#[derive(Debug, Clone)]
pub struct DebitRequest {
    pub branch_id: String,
    pub order_id: String,
    pub order_number: String,
    pub actor: Actor,
}

/// A deposit to convert into order credits.
#[derive(Debug, Clone)]
pub struct TopupRequest {
    pub branch_id: String,
    pub amount_fils: i64,
    /// Payment reference of the deposit. Repeated references replay.
    pub payment_reference: String,
    pub actor: Actor,
}

/// Result of a debit or top-up: the wallet after the call and the ledger entry
/// recording it (the original entry on a replay).
#[derive(Debug, Serialize, Clone)]
pub struct WalletReceipt {
    pub outcome: Outcome,
    pub wallet: WalletAccount,
    pub ledger_entry: LedgerEntry,
}

enum Attempt {
    Done(WalletReceipt),
    Retry { expected: u64, actual: u64 },
}

/// Order-credit wallet engine.
///
/// Every mutation is a read, a pure in-memory transition and a single atomic
/// `commit` guarded by the wallet version and the entry's idempotency key.
/// Losing a version race re-runs the whole algorithm against fresh state, so
/// the engine holds no locks and can run on many instances at once.
pub struct WalletEngine {
    fees: FeeResolver,
    store: WalletStoreBox,
    clock: ClockBox,
    config: EngineConfig,
}

impl WalletEngine {
    pub fn new(
        directory: BranchDirectoryBox,
        store: WalletStoreBox,
        clock: ClockBox,
        config: EngineConfig,
    ) -> Self {
        Self {
            fees: FeeResolver::new(directory),
            store,
            clock,
            config,
        }
    }

    /// Consumes exactly one order credit for `request.order_id`.
    ///
    /// Calling it again for the same order returns `Replayed` with the original
    /// ledger entry and leaves the wallet alone.
    pub async fn debit(&self, request: &DebitRequest) -> Result<WalletReceipt> {
        let key = order_debit_key(&request.order_id);
        for attempt in 0..=self.config.max_commit_retries {
            match self.try_debit(request, &key).await? {
                Attempt::Done(receipt) => return Ok(receipt),
                Attempt::Retry { expected, actual } => debug!(
                    branch_id = %request.branch_id,
                    order_id = %request.order_id,
                    attempt,
                    expected,
                    actual,
                    "wallet changed underneath debit, retrying"
                ),
            }
        }
        Err(self.retries_exhausted(&request.branch_id))
    }

    async fn try_debit(&self, request: &DebitRequest, key: &str) -> Result<Attempt> {
        if let Some(entry) = self.store.entry_by_idempotency_key(key).await? {
            return self.replay(entry).await.map(Attempt::Done);
        }

        let fee = self.fees.resolve(&request.branch_id).await?;
        if !fee.is_configured() {
            return Err(WalletError::PlatformFeeNotSet(request.branch_id.clone()));
        }

        let mut wallet = self.load_wallet(&request.branch_id).await?;
        let now = self.clock.now();

        if wallet.is_hard_locked(now) {
            warn!(
                branch_id = %wallet.branch_id,
                order_id = %request.order_id,
                "debit rejected, ordering locked"
            );
            return Err(WalletError::OrderingLocked(wallet.branch_id));
        }

        if wallet.total_orders_remaining() == 0 {
            if wallet.mark_exhausted(now) {
                let branch_id = wallet.branch_id.clone();
                if let Some(retry) = self.commit_wallet(wallet).await? {
                    return Ok(retry);
                }
                warn!(branch_id = %branch_id, "order credits exhausted, ordering locked");
                return Err(WalletError::WalletExhausted(branch_id));
            }
            return Err(WalletError::WalletExhausted(wallet.branch_id));
        }

        if wallet.consume_one().is_none() {
            return Err(WalletError::InsufficientOrders(wallet.branch_id));
        }
        wallet.updated_at = now;
        if wallet.total_orders_remaining() == 0 {
            wallet.mark_exhausted(now);
        }

        let entry = LedgerEntry::order_debit(
            self.entry_context(&wallet, &request.actor, fee.fee_fils, now)
                .await?,
            &request.order_id,
            &request.order_number,
        );
        let attempt = self.commit_with_entry(wallet, entry).await?;
        if let Attempt::Done(receipt) = &attempt
            && receipt.outcome == Outcome::Succeeded
        {
            info!(
                branch_id = %receipt.wallet.branch_id,
                order_id = %request.order_id,
                ledger_id = %receipt.ledger_entry.ledger_id,
                remaining = receipt.wallet.total_orders_remaining(),
                "order credit debited"
            );
        }
        Ok(attempt)
    }

    /// Converts a deposit into credits, opening the wallet on the first top-up
    /// and lifting any lock.
    pub async fn topup(&self, request: &TopupRequest) -> Result<WalletReceipt> {
        let key = topup_key(&request.payment_reference);
        for attempt in 0..=self.config.max_commit_retries {
            match self.try_topup(request, &key).await? {
                Attempt::Done(receipt) => return Ok(receipt),
                Attempt::Retry { expected, actual } => debug!(
                    branch_id = %request.branch_id,
                    payment_reference = %request.payment_reference,
                    attempt,
                    expected,
                    actual,
                    "wallet changed underneath top-up, retrying"
                ),
            }
        }
        Err(self.retries_exhausted(&request.branch_id))
    }

    async fn try_topup(&self, request: &TopupRequest, key: &str) -> Result<Attempt> {
        if let Some(entry) = self.store.entry_by_idempotency_key(key).await? {
            return self.replay(entry).await.map(Attempt::Done);
        }

        let fee = self.fees.resolve(&request.branch_id).await?;
        if !fee.is_configured() {
            return Err(WalletError::PlatformFeeNotSet(request.branch_id.clone()));
        }

        let quote = compute_topup(
            request.amount_fils,
            fee.signed_fils(),
            self.config.bonus_percent,
        );
        if quote.paid_orders == 0 {
            return Err(WalletError::TopupTooSmall {
                amount_fils: request.amount_fils,
                unit_fee_fils: fee.fee_fils,
            });
        }

        let now = self.clock.now();
        let mut wallet = match self.store.wallet(&request.branch_id).await? {
            Some(wallet) => wallet,
            None => WalletAccount::open(
                request.branch_id.as_str(),
                fee.vendor_id.as_str(),
                self.config.default_consume_priority,
                self.config.grace_days_after_exhausted,
                now,
            ),
        };
        if let Err(e) = wallet.credit(quote.paid_orders, quote.bonus_orders, now) {
            warn!(
                branch_id = %request.branch_id,
                payment_reference = %request.payment_reference,
                "top-up rejected, order credit counters would overflow"
            );
            return Err(e);
        }

        let entry = LedgerEntry::topup(
            self.entry_context(&wallet, &request.actor, fee.fee_fils, now)
                .await?,
            &request.payment_reference,
            request.amount_fils,
            quote.paid_orders,
            quote.bonus_orders,
        );
        let attempt = self.commit_with_entry(wallet, entry).await?;
        if let Attempt::Done(receipt) = &attempt
            && receipt.outcome == Outcome::Succeeded
        {
            info!(
                branch_id = %receipt.wallet.branch_id,
                ledger_id = %receipt.ledger_entry.ledger_id,
                paid = quote.paid_orders,
                bonus = quote.bonus_orders,
                "wallet topped up"
            );
        }
        Ok(attempt)
    }

    pub async fn set_consume_priority(
        &self,
        branch_id: &str,
        priority: ConsumePriority,
    ) -> Result<WalletAccount> {
        for _ in 0..=self.config.max_commit_retries {
            let mut wallet = self.load_wallet(branch_id).await?;
            if wallet.consume_priority == priority {
                return Ok(wallet);
            }
            wallet.consume_priority = priority;
            wallet.updated_at = self.clock.now();
            match self
                .store
                .commit(WalletCommit {
                    wallet,
                    entry: None,
                })
                .await?
            {
                CommitOutcome::Committed(stored) => return Ok(stored),
                CommitOutcome::VersionConflict { .. } | CommitOutcome::DuplicateKey(_) => {}
            }
        }
        Err(self.retries_exhausted(branch_id))
    }

    pub async fn wallet(&self, branch_id: &str) -> Result<WalletAccount> {
        self.load_wallet(branch_id).await
    }

    pub async fn wallet_state(&self, branch_id: &str) -> Result<WalletState> {
        let wallet = self.load_wallet(branch_id).await?;
        Ok(wallet.state_at(self.clock.now()))
    }

    pub async fn wallets(&self) -> Result<Vec<WalletAccount>> {
        self.store.wallets().await
    }

    pub async fn ledger(&self, branch_id: &str) -> Result<Vec<LedgerEntry>> {
        self.store.ledger_for_branch(branch_id).await
    }

    async fn load_wallet(&self, branch_id: &str) -> Result<WalletAccount> {
        self.store
            .wallet(branch_id)
            .await?
            .ok_or_else(|| WalletError::WalletNotFound(branch_id.to_string()))
    }

    async fn replay(&self, entry: LedgerEntry) -> Result<WalletReceipt> {
        debug!(
            idempotency_key = %entry.idempotency_key,
            ledger_id = %entry.ledger_id,
            "replaying recorded ledger entry"
        );
        let wallet = self.load_wallet(&entry.branch_id).await?;
        Ok(WalletReceipt {
            outcome: Outcome::Replayed,
            wallet,
            ledger_entry: entry,
        })
    }

    async fn entry_context<'a>(
        &'a self,
        wallet: &'a WalletAccount,
        actor: &'a Actor,
        unit_fee_fils: u64,
        now: DateTime<Utc>,
    ) -> Result<EntryContext<'a>> {
        let sequence = self.store.next_ledger_sequence().await?;
        Ok(EntryContext {
            ledger_id: format_ledger_id(now, sequence),
            wallet,
            actor,
            currency: &self.config.currency,
            unit_fee_fils,
            now,
        })
    }

    async fn commit_with_entry(
        &self,
        wallet: WalletAccount,
        entry: LedgerEntry,
    ) -> Result<Attempt> {
        let outcome = self
            .store
            .commit(WalletCommit {
                wallet,
                entry: Some(entry.clone()),
            })
            .await?;
        match outcome {
            CommitOutcome::Committed(stored) => Ok(Attempt::Done(WalletReceipt {
                outcome: Outcome::Succeeded,
                wallet: stored,
                ledger_entry: entry,
            })),
            CommitOutcome::DuplicateKey(existing) => {
                self.replay(existing).await.map(Attempt::Done)
            }
            CommitOutcome::VersionConflict { expected, actual } => {
                Ok(Attempt::Retry { expected, actual })
            }
        }
    }

    /// Commits a wallet-only change. Returns a retry when the version moved.
    async fn commit_wallet(&self, wallet: WalletAccount) -> Result<Option<Attempt>> {
        match self
            .store
            .commit(WalletCommit {
                wallet,
                entry: None,
            })
            .await?
        {
            CommitOutcome::VersionConflict { expected, actual } => {
                Ok(Some(Attempt::Retry { expected, actual }))
            }
            CommitOutcome::Committed(_) | CommitOutcome::DuplicateKey(_) => Ok(None),
        }
    }

    fn retries_exhausted(&self, branch_id: &str) -> WalletError {
        warn!(
            branch_id,
            retries = self.config.max_commit_retries,
            "giving up after repeated version conflicts"
        );
        WalletError::Conflict(format!(
            "wallet {} kept changing after {} retries",
            branch_id, self.config.max_commit_retries
        ))
    }
}
