use crate::domain::wallet::{ConsumePriority, WalletAccount, WalletState};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct WalletRow<'a> {
    branch: &'a str,
    vendor: &'a str,
    paid: u64,
    bonus: u64,
    total: u64,
    priority: ConsumePriority,
    locked: bool,
    state: WalletState,
    grace_until: Option<String>,
}

/// Writes wallet balances as CSV, evaluating each wallet's state at `now`.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_wallets(&mut self, wallets: &[WalletAccount], now: DateTime<Utc>) -> Result<()> {
        for wallet in wallets {
            self.writer.serialize(WalletRow {
                branch: &wallet.branch_id,
                vendor: &wallet.vendor_id,
                paid: wallet.paid_orders_remaining,
                bonus: wallet.bonus_orders_remaining,
                total: wallet.total_orders_remaining(),
                priority: wallet.consume_priority,
                locked: wallet.ordering_locked,
                state: wallet.state_at(now),
                grace_until: wallet.grace_until.map(|t| t.to_rfc3339()),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
