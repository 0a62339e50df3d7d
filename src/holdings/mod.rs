//! Holdings Ledger Module
//!
//! The authoritative store for user funds. One row per `(UserId, Symbol)`,
//! each row split into a total `amount` and a `locked` portion reserved for
//! in-flight withdrawals. Everything else in the system (review workflow,
//! swaps, transaction mirror) moves money exclusively through this module.
//!
//! Invariant on every row: `0 <= locked <= amount`.

pub mod balance;
pub mod error;
pub mod ledger;

// Re-exports for convenience
pub use balance::HoldingBalance;
pub use error::LedgerError;
pub use ledger::{HoldingView, HoldingsLedger};
