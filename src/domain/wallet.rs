use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WalletError;

/// Which credit pool a debit drains first.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsumePriority {
    #[default]
    BonusFirst,
    PaidFirst,
}

impl fmt::Display for ConsumePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumePriority::BonusFirst => f.write_str("bonus_first"),
            ConsumePriority::PaidFirst => f.write_str("paid_first"),
        }
    }
}

impl FromStr for ConsumePriority {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bonus_first" => Ok(ConsumePriority::BonusFirst),
            "paid_first" => Ok(ConsumePriority::PaidFirst),
            other => Err(WalletError::ValidationError(format!(
                "unknown consume priority '{}'",
                other
            ))),
        }
    }
}

/// Pool a single credit was taken from.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CreditPool {
    Paid,
    Bonus,
}

/// Ordering state of a wallet at a given instant.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletState {
    Active,
    ExhaustedGrace,
    Locked,
}

/// Point-in-time copy of the credit counters, stored on every ledger entry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct PoolSnapshot {
    pub paid_orders_remaining: u64,
    pub bonus_orders_remaining: u64,
    pub total_orders_remaining: u64,
    pub ordering_locked: bool,
}

/// Prepaid order-credit balance of a single branch.
///
/// The total remaining capacity is always derived from the two pools, so it can
/// never drift from them.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct WalletAccount {
    pub branch_id: String,
    pub vendor_id: String,
    pub paid_orders_remaining: u64,
    pub bonus_orders_remaining: u64,
    pub consume_priority: ConsumePriority,
    pub ordering_locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub exhausted_at: Option<DateTime<Utc>>,
    pub grace_until: Option<DateTime<Utc>>,
    pub grace_days_after_exhausted: u32,
    /// Optimistic concurrency token. Bumped by the store on every commit.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletAccount {
    /// Opens an empty wallet. A fresh wallet is unlocked; the first debit
    /// against it runs into the capacity gate.
    pub fn open(
        branch_id: impl Into<String>,
        vendor_id: impl Into<String>,
        consume_priority: ConsumePriority,
        grace_days_after_exhausted: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            branch_id: branch_id.into(),
            vendor_id: vendor_id.into(),
            paid_orders_remaining: 0,
            bonus_orders_remaining: 0,
            consume_priority,
            ordering_locked: false,
            locked_at: None,
            exhausted_at: None,
            grace_until: None,
            grace_days_after_exhausted,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_orders_remaining(&self) -> u64 {
        self.paid_orders_remaining + self.bonus_orders_remaining
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> WalletState {
        if !self.ordering_locked {
            return WalletState::Active;
        }
        match self.grace_until {
            Some(grace_until) if now <= grace_until => WalletState::ExhaustedGrace,
            _ => WalletState::Locked,
        }
    }

    /// True when the lock gate rejects orders: locked with no grace deadline or
    /// with the deadline already behind us.
    pub fn is_hard_locked(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == WalletState::Locked
    }

    /// Takes one credit following `consume_priority`. Returns `None` and leaves
    /// the pools untouched when both are empty.
    pub fn consume_one(&mut self) -> Option<CreditPool> {
        let order = match self.consume_priority {
            ConsumePriority::BonusFirst => [CreditPool::Bonus, CreditPool::Paid],
            ConsumePriority::PaidFirst => [CreditPool::Paid, CreditPool::Bonus],
        };
        for pool in order {
            let counter = match pool {
                CreditPool::Paid => &mut self.paid_orders_remaining,
                CreditPool::Bonus => &mut self.bonus_orders_remaining,
            };
            if *counter > 0 {
                *counter -= 1;
                return Some(pool);
            }
        }
        None
    }

    /// Moves the wallet into the exhausted/locked state.
    ///
    /// `exhausted_at` is set only once; an already locked and exhausted wallet is
    /// left as is so repeated attempts cannot stretch the grace window. Returns
    /// whether anything changed.
    pub fn mark_exhausted(&mut self, now: DateTime<Utc>) -> bool {
        if self.ordering_locked && self.exhausted_at.is_some() {
            return false;
        }
        let exhausted_at = *self.exhausted_at.get_or_insert(now);
        self.grace_until =
            Some(exhausted_at + TimeDelta::days(i64::from(self.grace_days_after_exhausted)));
        self.ordering_locked = true;
        self.locked_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Credits both pools and lifts any lock. This is the only way back to
    /// `Active` from `Locked`.
    ///
    /// Fails without touching the wallet when either pool, or their sum, would
    /// overflow.
    pub fn credit(
        &mut self,
        paid_orders: u64,
        bonus_orders: u64,
        now: DateTime<Utc>,
    ) -> Result<(), WalletError> {
        let paid = self.paid_orders_remaining.checked_add(paid_orders);
        let bonus = self.bonus_orders_remaining.checked_add(bonus_orders);
        let (paid, bonus) = match (paid, bonus) {
            (Some(paid), Some(bonus)) if paid.checked_add(bonus).is_some() => (paid, bonus),
            _ => {
                return Err(WalletError::ValidationError(format!(
                    "crediting {} paid + {} bonus orders overflows the wallet of branch {}",
                    paid_orders, bonus_orders, self.branch_id
                )));
            }
        };
        self.paid_orders_remaining = paid;
        self.bonus_orders_remaining = bonus;
        self.ordering_locked = false;
        self.locked_at = None;
        self.exhausted_at = None;
        self.grace_until = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            paid_orders_remaining: self.paid_orders_remaining,
            bonus_orders_remaining: self.bonus_orders_remaining,
            total_orders_remaining: self.total_orders_remaining(),
            ordering_locked: self.ordering_locked,
        }
    }
}
