//! Core type aliases shared by every module
//!
//! Plain aliases rather than newtypes for now; they carry the semantic
//! names and leave room to harden into wrapper types later.

/// User ID - globally unique, immutable after assignment.
///
/// # Usage:
/// - Primary key for user accounts
/// - First half of the `(UserId, Symbol)` holding key
pub type UserId = u64;

/// Asset symbol, e.g. "BTC", "ETH", "USDT".
///
/// # Constraints:
/// - **Canonical form**: uppercase, no whitespace
/// - Holdings, prices and the transaction mirror all key on it
pub type Symbol = String;

/// Sequence number for ordering mirror-transaction rows
pub type SeqNum = u64;
