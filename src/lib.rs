//! custodia - Custodial Balance Ledger Service
//!
//! Holdings with reserved amounts, human-reviewed funding, and atomic
//! asset conversion behind an HTTP gateway.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (UserId, Symbol, etc.)
//! - [`holdings`] - Per-user balance ledger with reserve/settle semantics
//! - [`review`] - Generic review state machine for funding requests
//! - [`funding`] - Deposit and withdrawal workflows
//! - [`swap`] - Quote and execute asset conversions
//! - [`prices`] - Upstream price source and TTL cache
//! - [`txlog`] - Append-only transaction read model
//! - [`notify`] - Fire-and-forget user notifications
//! - [`audit`] - CSV audit trail for balance mutations
//! - [`gateway`] - HTTP API surface
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;

// Ambient services
pub mod audit;
pub mod config;
pub mod logging;

// Domain modules
pub mod funding;
pub mod holdings;
pub mod notify;
pub mod prices;
pub mod review;
pub mod swap;
pub mod txlog;

// HTTP surface
pub mod gateway;

// Convenient re-exports at crate root
pub use core_types::{SeqNum, Symbol, UserId};
pub use funding::{DepositService, FundingError, WithdrawService};
pub use holdings::{HoldingView, HoldingsLedger, LedgerError};
pub use prices::{PriceCache, PriceSource};
pub use review::{ReviewError, ReviewRegistry, ReviewState, Reviewed};
pub use swap::{SwapEngine, SwapError};
pub use txlog::{Transaction, TransactionLog, TxKind, TxStatus};
