#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use orderwallet::application::engine::{DebitRequest, TopupRequest, WalletEngine};
use orderwallet::config::EngineConfig;
use orderwallet::domain::branch::BranchRecord;
use orderwallet::domain::ledger::Actor;
use orderwallet::domain::ports::{WalletCommit, WalletStore};
use orderwallet::domain::wallet::{ConsumePriority, WalletAccount};
use orderwallet::infrastructure::clock::FixedClock;
use orderwallet::infrastructure::in_memory::{InMemoryBranchDirectory, InMemoryWalletStore};
use std::io::Write;
use tempfile::NamedTempFile;

pub const BRANCH: &str = "branch-1";
pub const VENDOR: &str = "vendor-1";
pub const FEE_FILS: f64 = 250.0;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn directory() -> InMemoryBranchDirectory {
    InMemoryBranchDirectory::from_records([BranchRecord {
        branch_id: BRANCH.into(),
        vendor_id: VENDOR.into(),
        order_fee_fils: Some(FEE_FILS),
    }])
}

/// Store holding one wallet for `BRANCH` with the given pools.
pub async fn store_with_wallet(
    paid: u64,
    bonus: u64,
    priority: ConsumePriority,
) -> InMemoryWalletStore {
    let store = InMemoryWalletStore::new();
    let mut wallet = WalletAccount::open(BRANCH, VENDOR, priority, 3, t0());
    wallet.paid_orders_remaining = paid;
    wallet.bonus_orders_remaining = bonus;
    store
        .commit(WalletCommit {
            wallet,
            entry: None,
        })
        .await
        .unwrap();
    store
}

pub fn engine(store: InMemoryWalletStore, clock: FixedClock) -> WalletEngine {
    WalletEngine::new(
        Box::new(directory()),
        Box::new(store),
        Box::new(clock),
        EngineConfig::default(),
    )
}

pub fn debit(order_id: &str) -> DebitRequest {
    DebitRequest {
        branch_id: BRANCH.into(),
        order_id: order_id.into(),
        order_number: order_id.trim_start_matches("order-").into(),
        actor: Actor::new("cashier-1", "cashier"),
    }
}

pub fn topup(amount_fils: i64, reference: &str) -> TopupRequest {
    TopupRequest {
        branch_id: BRANCH.into(),
        amount_fils,
        payment_reference: reference.into(),
        actor: Actor::new("owner-1", "owner"),
    }
}

pub fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

pub fn branches_csv() -> NamedTempFile {
    csv_file(&[
        "branch,vendor,fee",
        "b1,v1,250",
        "b2,v1,100",
        "nofee,v2,",
    ])
}

pub const EVENTS_HEADER: &str = "type,branch,order,order_number,amount,reference,actor,role";
