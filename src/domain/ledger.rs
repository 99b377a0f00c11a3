use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::wallet::{PoolSnapshot, WalletAccount};

/// Fils per major currency unit (KWD, BHD, OMR all split into 1000 fils).
pub const FILS_SCALE: u32 = 3;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    OrderDebit,
    Topup,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Debit,
    Credit,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Succeeded,
    Failed,
}

/// Who triggered a balance change.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: role.into(),
        }
    }
}

/// Immutable audit record of one balance-changing event.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct LedgerEntry {
    pub ledger_id: String,
    pub branch_id: String,
    pub vendor_id: String,
    pub actor_user_id: String,
    pub actor_role: String,
    pub entry_type: EntryType,
    pub direction: Direction,
    pub amount_fils: i64,
    pub currency: String,
    pub unit_fee_fils: u64,
    pub orders_debited: u64,
    pub orders_credited: u64,
    pub order_id: Option<String>,
    pub order_number: Option<String>,
    pub payment_reference: Option<String>,
    pub status: LedgerStatus,
    pub idempotency_key: String,
    pub snapshot_after: PoolSnapshot,
    pub title: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

pub fn order_debit_key(order_id: &str) -> String {
    format!("ORDER_DEBIT:{}", order_id)
}

pub fn topup_key(payment_reference: &str) -> String {
    format!("TOPUP:{}", payment_reference)
}

/// Date-prefixed ledger id backed by the store's ledger sequence.
pub fn format_ledger_id(now: DateTime<Utc>, sequence: u64) -> String {
    format!("LED-{}-{:08}", now.format("%Y%m%d"), sequence)
}

fn signed_fils(fils: u64) -> i64 {
    i64::try_from(fils).unwrap_or(i64::MAX)
}

pub fn fils_to_major(amount_fils: i64) -> Decimal {
    Decimal::new(amount_fils, FILS_SCALE)
}

/// Fields shared by every entry built from a committed wallet.
pub struct EntryContext<'a> {
    pub ledger_id: String,
    pub wallet: &'a WalletAccount,
    pub actor: &'a Actor,
    pub currency: &'a str,
    pub unit_fee_fils: u64,
    pub now: DateTime<Utc>,
}

impl LedgerEntry {
    /// Entry for one order credit consumed by an accepted order.
    pub fn order_debit(ctx: EntryContext<'_>, order_id: &str, order_number: &str) -> Self {
        let fee = signed_fils(ctx.unit_fee_fils);
        Self {
            title: format!("Order #{} accepted", order_number),
            note: format!(
                "1 order credit debited at {} {}",
                fils_to_major(fee),
                ctx.currency
            ),
            idempotency_key: order_debit_key(order_id),
            entry_type: EntryType::OrderDebit,
            direction: Direction::Debit,
            amount_fils: fee,
            orders_debited: 1,
            orders_credited: 0,
            order_id: Some(order_id.to_string()),
            order_number: Some(order_number.to_string()),
            payment_reference: None,
            ..Self::base(ctx)
        }
    }

    /// Entry for credits bought with a deposit.
    pub fn topup(
        ctx: EntryContext<'_>,
        payment_reference: &str,
        amount_fils: i64,
        paid_orders: u64,
        bonus_orders: u64,
    ) -> Self {
        Self {
            title: format!("Top-up of {} {}", fils_to_major(amount_fils), ctx.currency),
            note: format!(
                "{} paid + {} bonus order credits at {} {} per order",
                paid_orders,
                bonus_orders,
                fils_to_major(signed_fils(ctx.unit_fee_fils)),
                ctx.currency
            ),
            idempotency_key: topup_key(payment_reference),
            entry_type: EntryType::Topup,
            direction: Direction::Credit,
            amount_fils,
            orders_debited: 0,
            orders_credited: paid_orders + bonus_orders,
            order_id: None,
            order_number: None,
            payment_reference: Some(payment_reference.to_string()),
            ..Self::base(ctx)
        }
    }

    fn base(ctx: EntryContext<'_>) -> Self {
        Self {
            ledger_id: ctx.ledger_id,
            branch_id: ctx.wallet.branch_id.clone(),
            vendor_id: ctx.wallet.vendor_id.clone(),
            actor_user_id: ctx.actor.user_id.clone(),
            actor_role: ctx.actor.role.clone(),
            entry_type: EntryType::OrderDebit,
            direction: Direction::Debit,
            amount_fils: 0,
            currency: ctx.currency.to_string(),
            unit_fee_fils: ctx.unit_fee_fils,
            orders_debited: 0,
            orders_credited: 0,
            order_id: None,
            order_number: None,
            payment_reference: None,
            status: LedgerStatus::Succeeded,
            idempotency_key: String::new(),
            snapshot_after: ctx.wallet.snapshot(),
            title: String::new(),
            note: String::new(),
            created_at: ctx.now,
        }
    }
}
