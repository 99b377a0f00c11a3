//! Domain layer: wallet state, ledger records, the top-up formula and the
//! ports the application layer talks to.

pub mod branch;
pub mod ledger;
pub mod ports;
pub mod topup;
pub mod wallet;
