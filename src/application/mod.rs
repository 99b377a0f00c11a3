//! Application layer containing the wallet orchestration.
//!
//! `WalletEngine` is the entry point for debits, top-ups and wallet queries.
//! It composes the fee resolver with the wallet store and never holds state of
//! its own between calls, so any number of engines may share one store.

pub mod engine;
pub mod fee_resolver;
