//! Transaction mirror - the user-facing activity feed.
//!
//! Every funding decision and swap appends or updates exactly one row
//! here, keyed by a unique reference string (`DEP_<id>`, `WD_<id>`,
//! `SWAP_<uuid>`). This is a READ MODEL: balances are never derived from
//! it and it is never consulted to authorize anything.

use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core_types::{SeqNum, Symbol, UserId};

/// Default page size for history queries.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxLogError {
    #[error("Duplicate reference: {0}")]
    DuplicateReference(String),

    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TxKind {
    Deposit = 1,
    Withdrawal = 2,
    /// Asset-to-asset swap
    Transfer = 3,
}

impl TxKind {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TxKind::Deposit),
            2 => Some(TxKind::Withdrawal),
            3 => Some(TxKind::Transfer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Deposit => "DEPOSIT",
            TxKind::Withdrawal => "WITHDRAWAL",
            TxKind::Transfer => "TRANSFER",
        }
    }

    /// Reference prefix for this kind (`DEP_`, `WD_`, `SWAP_`).
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            TxKind::Deposit => "DEP",
            TxKind::Withdrawal => "WD",
            TxKind::Transfer => "SWAP",
        }
    }

    /// Build the unique mirror reference for an entity of this kind.
    pub fn reference(&self, entity_id: &str) -> String {
        format!("{}_{}", self.reference_prefix(), entity_id)
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TxStatus {
    Pending = 0,
    Confirmed = 1,
    Failed = -1,
}

impl TxStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TxStatus::Pending),
            1 => Some(TxStatus::Confirmed),
            -1 => Some(TxStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Confirmed => "CONFIRMED",
            TxStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One mirror row.
///
/// For swaps, `symbol` carries the `FROM->TO` pair label and `amount`
/// the input amount.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: SeqNum,
    pub reference: String,
    pub kind: TxKind,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub amount: Decimal,
    pub status: TxStatus,
    /// Created timestamp (millis)
    pub created_at: i64,
    /// Last updated timestamp (millis)
    pub updated_at: i64,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tx[{}] {} {} user={} {} {} status={}",
            self.id, self.reference, self.kind, self.user_id, self.amount, self.symbol, self.status
        )
    }
}

struct TxLogInner {
    rows: Vec<Transaction>,
    by_reference: FxHashMap<String, usize>,
}

/// Append-only transaction store with a unique-reference index.
pub struct TransactionLog {
    seq: AtomicU64,
    inner: RwLock<TxLogInner>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(1),
            inner: RwLock::new(TxLogInner {
                rows: Vec::new(),
                by_reference: FxHashMap::default(),
            }),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TxLogInner> {
        match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TxLogInner> {
        match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append a new row. The reference must be globally unique.
    pub fn append(
        &self,
        reference: String,
        kind: TxKind,
        user_id: UserId,
        symbol: &str,
        amount: Decimal,
        status: TxStatus,
    ) -> Result<Transaction, TxLogError> {
        let mut inner = self.write();
        if inner.by_reference.contains_key(&reference) {
            return Err(TxLogError::DuplicateReference(reference));
        }

        let now = chrono::Utc::now().timestamp_millis();
        let tx = Transaction {
            id: self.seq.fetch_add(1, Ordering::SeqCst),
            reference: reference.clone(),
            kind,
            user_id,
            symbol: symbol.to_string(),
            amount,
            status,
            created_at: now,
            updated_at: now,
        };

        let index = inner.rows.len();
        inner.rows.push(tx.clone());
        inner.by_reference.insert(reference, index);
        Ok(tx)
    }

    /// Move a row to a new status, bumping `updated_at`.
    pub fn update_status(
        &self,
        reference: &str,
        status: TxStatus,
    ) -> Result<Transaction, TxLogError> {
        let mut inner = self.write();
        let index = *inner
            .by_reference
            .get(reference)
            .ok_or_else(|| TxLogError::ReferenceNotFound(reference.to_string()))?;

        let row = &mut inner.rows[index];
        row.status = status;
        row.updated_at = chrono::Utc::now().timestamp_millis();
        Ok(row.clone())
    }

    /// The row behind one reference, if any.
    pub fn get(&self, reference: &str) -> Option<Transaction> {
        let inner = self.read();
        let index = *inner.by_reference.get(reference)?;
        Some(inner.rows[index].clone())
    }

    /// True when the reference has a mirror row.
    pub fn contains(&self, reference: &str) -> bool {
        self.read().by_reference.contains_key(reference)
    }

    /// Newest-first activity of one user, capped at `limit` rows.
    pub fn history(&self, user_id: UserId, limit: usize) -> Vec<Transaction> {
        let inner = self.read();
        inner
            .rows
            .iter()
            .rev()
            .filter(|tx| tx.user_id == user_id)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().rows.is_empty()
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_append_and_get() {
        let log = TransactionLog::new();
        let tx = log
            .append(
                "DEP_01".to_string(),
                TxKind::Deposit,
                7,
                "BTC",
                dec!(1.25),
                TxStatus::Pending,
            )
            .unwrap();
        assert_eq!(tx.id, 1);
        assert_eq!(tx.status, TxStatus::Pending);

        let fetched = log.get("DEP_01").unwrap();
        assert_eq!(fetched.reference, "DEP_01");
        assert_eq!(fetched.amount, dec!(1.25));
    }

    #[test]
    fn test_duplicate_reference_rejected() {
        let log = TransactionLog::new();
        log.append(
            "WD_01".to_string(),
            TxKind::Withdrawal,
            7,
            "ETH",
            dec!(2),
            TxStatus::Pending,
        )
        .unwrap();

        let err = log
            .append(
                "WD_01".to_string(),
                TxKind::Withdrawal,
                7,
                "ETH",
                dec!(2),
                TxStatus::Pending,
            )
            .unwrap_err();
        assert_eq!(err, TxLogError::DuplicateReference("WD_01".to_string()));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_update_status() {
        let log = TransactionLog::new();
        let tx = log
            .append(
                "WD_02".to_string(),
                TxKind::Withdrawal,
                7,
                "ETH",
                dec!(2),
                TxStatus::Pending,
            )
            .unwrap();

        let updated = log.update_status("WD_02", TxStatus::Confirmed).unwrap();
        assert_eq!(updated.status, TxStatus::Confirmed);
        assert!(updated.updated_at >= tx.created_at);

        let err = log
            .update_status("WD_MISSING", TxStatus::Failed)
            .unwrap_err();
        assert_eq!(
            err,
            TxLogError::ReferenceNotFound("WD_MISSING".to_string())
        );
    }

    #[test]
    fn test_history_newest_first_with_limit() {
        let log = TransactionLog::new();
        for i in 0..5 {
            log.append(
                format!("DEP_{i}"),
                TxKind::Deposit,
                1,
                "USDT",
                Decimal::from(i),
                TxStatus::Confirmed,
            )
            .unwrap();
        }
        // Another user's row must not leak in
        log.append(
            "DEP_OTHER".to_string(),
            TxKind::Deposit,
            2,
            "USDT",
            dec!(9),
            TxStatus::Confirmed,
        )
        .unwrap();

        let recent = log.history(1, 3);
        assert_eq!(recent.len(), 3);
        let refs: Vec<_> = recent.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(refs, vec!["DEP_4", "DEP_3", "DEP_2"]);
    }

    #[test]
    fn test_kind_reference_builders() {
        assert_eq!(TxKind::Deposit.reference("abc"), "DEP_abc");
        assert_eq!(TxKind::Withdrawal.reference("abc"), "WD_abc");
        assert_eq!(TxKind::Transfer.reference("abc"), "SWAP_abc");
    }

    #[test]
    fn test_kind_status_roundtrip() {
        for kind in [TxKind::Deposit, TxKind::Withdrawal, TxKind::Transfer] {
            assert_eq!(TxKind::from_id(kind.id()), Some(kind));
        }
        for status in [TxStatus::Pending, TxStatus::Confirmed, TxStatus::Failed] {
            assert_eq!(TxStatus::from_id(status.id()), Some(status));
        }
        assert!(TxKind::from_id(0).is_none());
        assert!(TxStatus::from_id(7).is_none());
    }
}
