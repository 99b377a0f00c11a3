use crate::application::engine::{DebitRequest, TopupRequest};
use crate::domain::ledger::Actor;
use crate::error::{Result, WalletError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Topup,
    Debit,
}

/// One row of the events file.
///
/// Debits need `order` (and optionally `order_number`, defaulting to the
/// order id); top-ups need `amount` in fils and a payment `reference`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct WalletEvent {
    pub r#type: EventType,
    pub branch: String,
    pub order: Option<String>,
    pub order_number: Option<String>,
    pub amount: Option<i64>,
    pub reference: Option<String>,
    pub actor: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub enum WalletCommand {
    Debit(DebitRequest),
    Topup(TopupRequest),
}

fn required<T>(value: Option<T>, field: &str, event: EventType) -> Result<T> {
    value.ok_or_else(|| {
        WalletError::ValidationError(format!("{:?} event is missing '{}'", event, field))
    })
}

impl WalletEvent {
    pub fn into_command(self) -> Result<WalletCommand> {
        let actor = Actor::new(self.actor, self.role);
        match self.r#type {
            EventType::Debit => {
                let order_id = required(self.order, "order", self.r#type)?;
                Ok(WalletCommand::Debit(DebitRequest {
                    branch_id: self.branch,
                    order_number: self.order_number.unwrap_or_else(|| order_id.clone()),
                    order_id,
                    actor,
                }))
            }
            EventType::Topup => Ok(WalletCommand::Topup(TopupRequest {
                branch_id: self.branch,
                amount_fils: required(self.amount, "amount", self.r#type)?,
                payment_reference: required(self.reference, "reference", self.r#type)?,
                actor,
            })),
        }
    }
}

/// Streams wallet events from a CSV source.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily parses rows into engine commands. Bad rows come back as errors
    /// without ending the stream.
    pub fn commands(self) -> impl Iterator<Item = Result<WalletCommand>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(WalletError::from)
                .and_then(WalletEvent::into_command)
        })
    }
}
