pub mod branch_reader;
pub mod event_reader;
pub mod ledger_writer;
pub mod wallet_writer;
