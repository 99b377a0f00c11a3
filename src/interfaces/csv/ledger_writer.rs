use crate::domain::ledger::{Direction, EntryType, LedgerEntry, LedgerStatus};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    ledger_id: &'a str,
    branch: &'a str,
    vendor: &'a str,
    entry_type: EntryType,
    direction: Direction,
    amount_fils: i64,
    currency: &'a str,
    orders_debited: u64,
    orders_credited: u64,
    order: Option<&'a str>,
    reference: Option<&'a str>,
    status: LedgerStatus,
    idempotency_key: &'a str,
    paid_after: u64,
    bonus_after: u64,
    actor: &'a str,
    created_at: String,
}

/// Dumps ledger entries as an audit CSV.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_entries(&mut self, entries: &[LedgerEntry]) -> Result<()> {
        for entry in entries {
            self.writer.serialize(LedgerRow {
                ledger_id: &entry.ledger_id,
                branch: &entry.branch_id,
                vendor: &entry.vendor_id,
                entry_type: entry.entry_type,
                direction: entry.direction,
                amount_fils: entry.amount_fils,
                currency: &entry.currency,
                orders_debited: entry.orders_debited,
                orders_credited: entry.orders_credited,
                order: entry.order_id.as_deref(),
                reference: entry.payment_reference.as_deref(),
                status: entry.status,
                idempotency_key: &entry.idempotency_key,
                paid_after: entry.snapshot_after.paid_orders_remaining,
                bonus_after: entry.snapshot_after.bonus_orders_remaining,
                actor: &entry.actor_user_id,
                created_at: entry.created_at.to_rfc3339(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
