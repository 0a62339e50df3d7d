//! Row-locked holdings store.
//!
//! Each `(user, symbol)` holding lives behind its own async mutex, so
//! operations on the same row are strictly serialized (one winner when two
//! reserves race for the same funds) while different rows proceed in
//! parallel. The DashMap shard guard is never held across an await; rows
//! are cloned out as `Arc<Mutex<_>>` first, then locked.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::audit::{AuditLog, AuditRecord};
use crate::core_types::{Symbol, UserId};

use super::balance::HoldingBalance;
use super::error::LedgerError;

/// Read-only snapshot of one holding row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HoldingView {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub amount: Decimal,
    pub locked: Decimal,
    pub available: Decimal,
}

impl HoldingView {
    fn from_balance(user_id: UserId, symbol: &str, balance: &HoldingBalance) -> Self {
        Self {
            user_id,
            symbol: symbol.to_string(),
            amount: balance.amount(),
            locked: balance.locked(),
            available: balance.available(),
        }
    }
}

/// The authoritative balance store.
///
/// Rows are created lazily (zero balance) on first touch. Every mutation
/// goes through [`HoldingBalance`], so the `0 <= locked <= amount`
/// invariant cannot be violated from outside.
pub struct HoldingsLedger {
    rows: DashMap<(UserId, Symbol), Arc<Mutex<HoldingBalance>>>,
    audit: Option<Arc<AuditLog>>,
}

impl HoldingsLedger {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            audit: None,
        }
    }

    /// Ledger that appends every successful mutation to `audit`.
    pub fn with_audit(audit: Arc<AuditLog>) -> Self {
        Self {
            rows: DashMap::new(),
            audit: Some(audit),
        }
    }

    /// Fetch the row lock, creating a zeroed row on first touch.
    ///
    /// Clones the Arc out of the map entry so the shard guard is released
    /// before the caller awaits the row mutex.
    fn row(&self, user_id: UserId, symbol: &str) -> Arc<Mutex<HoldingBalance>> {
        self.rows
            .entry((user_id, symbol.to_string()))
            .or_default()
            .clone()
    }

    fn record_audit(
        &self,
        op: &'static str,
        user_id: UserId,
        symbol: &str,
        delta: Decimal,
        after: &HoldingBalance,
    ) {
        if let Some(audit) = &self.audit {
            audit.record(&AuditRecord {
                user_id,
                symbol,
                op,
                delta,
                amount_after: after.amount(),
                locked_after: after.locked(),
                version: after.version(),
            });
        }
    }

    /// Apply one validated mutation under the row lock.
    ///
    /// The mutation runs on a copy and is only written back on success, so
    /// a failed operation leaves the row byte-for-byte untouched.
    async fn apply<F>(
        &self,
        user_id: UserId,
        symbol: &str,
        op: &'static str,
        delta: Decimal,
        mutate: F,
    ) -> Result<HoldingView, LedgerError>
    where
        F: FnOnce(&mut HoldingBalance) -> Result<(), LedgerError>,
    {
        let row = self.row(user_id, symbol);
        let mut guard = row.lock().await;

        let mut next = *guard;
        mutate(&mut next)?;
        debug_assert!(next.is_consistent());
        *guard = next;
        // Audit inside the lock: trail order matches commit order per row.
        self.record_audit(op, user_id, symbol, delta, &next);
        drop(guard);

        debug!(user_id, symbol, op, %delta, "holding mutated");
        Ok(HoldingView::from_balance(user_id, symbol, &next))
    }

    // ============================================================
    // Operations
    // ============================================================

    /// Current row state, creating a zeroed row if absent.
    pub async fn get_or_create(&self, user_id: UserId, symbol: &str) -> HoldingView {
        let row = self.row(user_id, symbol);
        let guard = row.lock().await;
        HoldingView::from_balance(user_id, symbol, &guard)
    }

    /// Add funds to `amount`.
    pub async fn credit(
        &self,
        user_id: UserId,
        symbol: &str,
        qty: Decimal,
    ) -> Result<HoldingView, LedgerError> {
        self.apply(user_id, symbol, "credit", qty, |b| b.credit(qty))
            .await
    }

    /// Remove spendable funds; fails unless `available >= qty`.
    pub async fn debit(
        &self,
        user_id: UserId,
        symbol: &str,
        qty: Decimal,
    ) -> Result<HoldingView, LedgerError> {
        self.apply(user_id, symbol, "debit", qty, |b| b.debit(qty))
            .await
    }

    /// Move spendable funds into the locked portion.
    pub async fn reserve(
        &self,
        user_id: UserId,
        symbol: &str,
        qty: Decimal,
    ) -> Result<HoldingView, LedgerError> {
        self.apply(user_id, symbol, "reserve", qty, |b| b.reserve(qty))
            .await
    }

    /// Return locked funds to the spendable pool. Total is untouched.
    pub async fn release(
        &self,
        user_id: UserId,
        symbol: &str,
        qty: Decimal,
    ) -> Result<HoldingView, LedgerError> {
        self.apply(user_id, symbol, "release", qty, |b| b.release(qty))
            .await
    }

    /// Consume locked funds: removes `qty` from both `locked` and `amount`.
    pub async fn settle(
        &self,
        user_id: UserId,
        symbol: &str,
        qty: Decimal,
    ) -> Result<HoldingView, LedgerError> {
        self.apply(user_id, symbol, "settle", qty, |b| b.settle(qty))
            .await
    }

    /// Atomic two-row exchange: debit `from`, credit `to`, as one unit.
    ///
    /// Both row locks are taken in symbol order (so concurrent swaps over
    /// the same pair in opposite directions cannot deadlock), the debit is
    /// validated first, and either both legs commit or neither does.
    pub async fn convert(
        &self,
        user_id: UserId,
        from: &str,
        debit_qty: Decimal,
        to: &str,
        credit_qty: Decimal,
    ) -> Result<(HoldingView, HoldingView), LedgerError> {
        if from == to {
            // One row cannot be locked twice; callers reject same-symbol
            // conversions before reaching the ledger.
            return Err(LedgerError::InvalidAmount);
        }

        let from_row = self.row(user_id, from);
        let to_row = self.row(user_id, to);

        let (mut from_guard, mut to_guard) = if from < to {
            let f = from_row.lock().await;
            let t = to_row.lock().await;
            (f, t)
        } else {
            let t = to_row.lock().await;
            let f = from_row.lock().await;
            (f, t)
        };

        // Validate on copies, then commit both legs together.
        let mut from_next = *from_guard;
        let mut to_next = *to_guard;
        from_next.debit(debit_qty)?;
        to_next.credit(credit_qty)?;
        debug_assert!(from_next.is_consistent() && to_next.is_consistent());

        *from_guard = from_next;
        *to_guard = to_next;
        self.record_audit("convert_out", user_id, from, debit_qty, &from_next);
        self.record_audit("convert_in", user_id, to, credit_qty, &to_next);
        drop(from_guard);
        drop(to_guard);

        debug!(user_id, from, to, %debit_qty, %credit_qty, "holdings converted");
        Ok((
            HoldingView::from_balance(user_id, from, &from_next),
            HoldingView::from_balance(user_id, to, &to_next),
        ))
    }

    // ============================================================
    // Read side
    // ============================================================

    /// Snapshot of one row; `None` if the row was never touched.
    pub async fn view(&self, user_id: UserId, symbol: &str) -> Option<HoldingView> {
        let row = self
            .rows
            .get(&(user_id, symbol.to_string()))
            .map(|e| e.value().clone())?;
        let guard = row.lock().await;
        Some(HoldingView::from_balance(user_id, symbol, &guard))
    }

    /// All holdings of one user, sorted by symbol.
    pub async fn balances(&self, user_id: UserId) -> Vec<HoldingView> {
        // Collect row handles first; never lock rows while iterating shards.
        let rows: Vec<(Symbol, Arc<Mutex<HoldingBalance>>)> = self
            .rows
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| (e.key().1.clone(), e.value().clone()))
            .collect();

        let mut out = Vec::with_capacity(rows.len());
        for (symbol, row) in rows {
            let guard = row.lock().await;
            out.push(HoldingView::from_balance(user_id, &symbol, &guard));
        }
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        out
    }
}

impl Default for HoldingsLedger {
    fn default() -> Self {
        Self::new()
    }
}
