//! ENFORCED BALANCE TYPE - the single source of truth for holding math.
//!
//! ALL balance mutations MUST go through these methods.
//!
//! # Enforcement Strategy:
//! 1. Fields are PRIVATE - no direct access
//! 2. All mutations return Result - errors are explicit
//! 3. Version auto-increments - audit trail
//! 4. checked_add/sub - overflow protection
//! 5. Type system prevents bypassing validation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Balance for a single `(user, symbol)` holding.
///
/// # Invariants (ENFORCED by private fields):
/// - `0 <= locked <= amount`
/// - `available = amount - locked` (derived, never stored)
/// - Version increments on every successful mutation
/// - All amounts are exact decimals; no floating point anywhere
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HoldingBalance {
    amount: Decimal, // PRIVATE - total funds, ONLY modified through credit/debit/settle
    locked: Decimal, // PRIVATE - reserved portion, ONLY modified through reserve/release/settle
    version: u64,    // PRIVATE - incremented on every successful mutation
}

impl Default for HoldingBalance {
    fn default() -> Self {
        Self {
            amount: Decimal::ZERO,
            locked: Decimal::ZERO,
            version: 0,
        }
    }
}

impl HoldingBalance {
    // ============================================================
    // READ-ONLY GETTERS (safe to expose)
    // ============================================================

    /// Total funds, including the locked portion
    #[inline(always)]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Funds reserved for in-flight withdrawals
    #[inline(always)]
    pub const fn locked(&self) -> Decimal {
        self.locked
    }

    /// Spendable funds: `amount - locked`
    #[inline(always)]
    pub fn available(&self) -> Decimal {
        self.amount - self.locked
    }

    /// Mutation counter (audit trail ordering)
    #[inline(always)]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Row invariant holds. Used in debug assertions by the row store.
    #[inline]
    pub(crate) fn is_consistent(&self) -> bool {
        self.locked >= Decimal::ZERO && self.locked <= self.amount
    }

    // ============================================================
    // VALIDATED MUTATIONS (ENFORCED operations)
    // ============================================================

    /// Add funds to the total.
    ///
    /// # Errors
    /// - `InvalidAmount` unless `qty > 0`
    /// - `Overflow` on arithmetic overflow
    pub fn credit(&mut self, qty: Decimal) -> Result<(), LedgerError> {
        Self::require_positive(qty)?;
        self.amount = self.amount.checked_add(qty).ok_or(LedgerError::Overflow)?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Remove spendable funds from the total.
    ///
    /// # Errors
    /// - `InvalidAmount` unless `qty > 0`
    /// - `InsufficientBalance` if `available < qty` (locked funds cannot be debited)
    pub fn debit(&mut self, qty: Decimal) -> Result<(), LedgerError> {
        Self::require_positive(qty)?;
        let available = self.available();
        if available < qty {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: qty,
            });
        }
        self.amount = self.amount.checked_sub(qty).ok_or(LedgerError::Overflow)?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Reserve spendable funds for a pending withdrawal.
    ///
    /// The total is untouched; the reserved portion just stops being
    /// spendable until released or settled.
    ///
    /// # Errors
    /// - `InvalidAmount` unless `qty > 0`
    /// - `InsufficientBalance` if `available < qty`
    pub fn reserve(&mut self, qty: Decimal) -> Result<(), LedgerError> {
        Self::require_positive(qty)?;
        let available = self.available();
        if available < qty {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: qty,
            });
        }
        self.locked = self.locked.checked_add(qty).ok_or(LedgerError::Overflow)?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Return reserved funds to the spendable pool (rejected withdrawal).
    ///
    /// Only the lock moves: the total stays exactly as it was, which makes
    /// reserve -> release a perfect round trip.
    ///
    /// # Errors
    /// - `InvalidAmount` unless `qty > 0`
    /// - `InsufficientLocked` if `locked < qty`
    pub fn release(&mut self, qty: Decimal) -> Result<(), LedgerError> {
        Self::require_positive(qty)?;
        if self.locked < qty {
            return Err(LedgerError::InsufficientLocked {
                locked: self.locked,
                requested: qty,
            });
        }
        self.locked = self.locked.checked_sub(qty).ok_or(LedgerError::Overflow)?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Consume reserved funds (approved withdrawal).
    ///
    /// Removes `qty` from BOTH the lock and the total, so the funds
    /// actually leave the account exactly once.
    ///
    /// # Errors
    /// - `InvalidAmount` unless `qty > 0`
    /// - `InsufficientLocked` if `locked < qty`
    pub fn settle(&mut self, qty: Decimal) -> Result<(), LedgerError> {
        Self::require_positive(qty)?;
        if self.locked < qty {
            return Err(LedgerError::InsufficientLocked {
                locked: self.locked,
                requested: qty,
            });
        }
        // locked <= amount, so amount >= qty here
        self.locked = self.locked.checked_sub(qty).ok_or(LedgerError::Overflow)?;
        self.amount = self.amount.checked_sub(qty).ok_or(LedgerError::Overflow)?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    #[inline]
    fn require_positive(qty: Decimal) -> Result<(), LedgerError> {
        if qty <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(())
    }
}

// ============================================================
// TESTS - Prove enforcement works
// ============================================================
