use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::core_types::{Symbol, UserId};
use crate::review::{ReviewState, Reviewed};

/// Unique funding request id (ULID, sortable by creation time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_str(s)?))
    }
}

/// An announced incoming deposit awaiting review.
#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub amount: Decimal,
    /// External reference the user supplied (tx hash, wire id)
    pub external_ref: Option<String>,
    pub state: ReviewState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DepositRequest {
    pub fn new(
        user_id: UserId,
        symbol: Symbol,
        amount: Decimal,
        external_ref: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: RequestId::new(),
            user_id,
            symbol,
            amount,
            external_ref,
            state: ReviewState::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Reviewed for DepositRequest {
    fn state(&self) -> ReviewState {
        self.state
    }

    fn set_state(&mut self, state: ReviewState) {
        self.state = state;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

/// A withdrawal request. `amount` is the gross debit against the user;
/// the network receives `amount - fee`.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub amount: Decimal,
    pub fee: Decimal,
    pub address: String,
    pub memo: Option<String>,
    pub network: Option<String>,
    pub state: ReviewState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WithdrawalRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        symbol: Symbol,
        amount: Decimal,
        fee: Decimal,
        address: String,
        memo: Option<String>,
        network: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: RequestId::new(),
            user_id,
            symbol,
            amount,
            fee,
            address,
            memo,
            network,
            state: ReviewState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount the network pays out after the fee.
    pub fn net_amount(&self) -> Decimal {
        self.amount - self.fee
    }
}

impl Reviewed for WithdrawalRequest {
    fn state(&self) -> ReviewState {
        self.state
    }

    fn set_state(&mut self, state: ReviewState) {
        self.state = state;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

// --- API views ---

#[derive(Debug, Serialize)]
pub struct DepositView {
    pub id: String,
    pub symbol: Symbol,
    pub amount: Decimal,
    pub external_ref: Option<String>,
    pub state: ReviewState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&DepositRequest> for DepositView {
    fn from(req: &DepositRequest) -> Self {
        Self {
            id: req.id.to_string(),
            symbol: req.symbol.clone(),
            amount: req.amount,
            external_ref: req.external_ref.clone(),
            state: req.state,
            created_at: req.created_at,
            updated_at: req.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WithdrawalView {
    pub id: String,
    pub symbol: Symbol,
    pub amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub address: String,
    pub memo: Option<String>,
    pub network: Option<String>,
    pub state: ReviewState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&WithdrawalRequest> for WithdrawalView {
    fn from(req: &WithdrawalRequest) -> Self {
        Self {
            id: req.id.to_string(),
            symbol: req.symbol.clone(),
            amount: req.amount,
            fee: req.fee,
            net_amount: req.net_amount(),
            address: req.address.clone(),
            memo: req.memo.clone(),
            network: req.network.clone(),
            state: req.state,
            created_at: req.created_at,
            updated_at: req.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_id_roundtrip() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_request_ids_sort_by_creation() {
        let a = RequestId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = RequestId::new();
        assert!(a < b);
    }

    #[test]
    fn test_set_state_bumps_updated_at() {
        let mut req = DepositRequest::new(1, "BTC".to_string(), dec!(1), None);
        let before = req.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        req.set_state(ReviewState::UnderReview);
        assert!(req.updated_at > before);
        assert_eq!(req.state, ReviewState::UnderReview);
    }

    #[test]
    fn test_withdrawal_net_amount() {
        let req = WithdrawalRequest::new(
            1,
            "ETH".to_string(),
            dec!(10),
            dec!(0.25),
            "0xabc".to_string(),
            None,
            Some("ETH".to_string()),
        );
        assert_eq!(req.net_amount(), dec!(9.75));
    }
}
