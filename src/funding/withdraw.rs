//! Withdrawal intake with a reserved-funds hold.
//!
//! Creating a request reserves the gross amount immediately, so the
//! money cannot be spent while compliance looks at it. Approval settles
//! the hold (locked and total both drop); rejection releases it back to
//! available in full.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use super::error::FundingError;
use super::types::WithdrawalRequest;
use crate::core_types::UserId;
use crate::holdings::HoldingsLedger;
use crate::notify::{Notifier, NotifyEvent};
use crate::review::{ReviewEffect, ReviewRegistry, ReviewState};
use crate::txlog::{DEFAULT_HISTORY_LIMIT, TransactionLog, TxKind, TxLogError, TxStatus};

/// What an approval or rejection does besides flipping the state.
pub struct WithdrawalEffect {
    ledger: Arc<HoldingsLedger>,
    txlog: Arc<TransactionLog>,
    notifier: Notifier,
}

#[async_trait]
impl ReviewEffect<WithdrawalRequest> for WithdrawalEffect {
    type Error = FundingError;

    async fn apply(
        &self,
        request: &WithdrawalRequest,
        _from: ReviewState,
        to: ReviewState,
    ) -> Result<(), FundingError> {
        let reference = TxKind::Withdrawal.reference(&request.id.to_string());
        match to {
            ReviewState::Approved => {
                if !self.txlog.contains(&reference) {
                    return Err(TxLogError::ReferenceNotFound(reference).into());
                }
                // Consume the hold placed at creation
                self.ledger
                    .settle(request.user_id, &request.symbol, request.amount)
                    .await?;
                let tx = self.txlog.update_status(&reference, TxStatus::Confirmed)?;
                self.notifier.publish(NotifyEvent::for_transaction(&tx));
            }
            ReviewState::Rejected => {
                if !self.txlog.contains(&reference) {
                    return Err(TxLogError::ReferenceNotFound(reference).into());
                }
                // Give the hold back in full
                self.ledger
                    .release(request.user_id, &request.symbol, request.amount)
                    .await?;
                let tx = self.txlog.update_status(&reference, TxStatus::Failed)?;
                self.notifier.publish(NotifyEvent::for_transaction(&tx));
            }
            ReviewState::Pending | ReviewState::UnderReview => {}
        }
        Ok(())
    }
}

pub struct WithdrawService {
    ledger: Arc<HoldingsLedger>,
    registry: ReviewRegistry<WithdrawalRequest>,
    effect: WithdrawalEffect,
    txlog: Arc<TransactionLog>,
    notifier: Notifier,
}

impl WithdrawService {
    pub fn new(
        ledger: Arc<HoldingsLedger>,
        txlog: Arc<TransactionLog>,
        notifier: Notifier,
    ) -> Self {
        Self {
            ledger: ledger.clone(),
            registry: ReviewRegistry::new(),
            effect: WithdrawalEffect {
                ledger,
                txlog: txlog.clone(),
                notifier: notifier.clone(),
            },
            txlog,
            notifier,
        }
    }

    /// Request a withdrawal. Reserves the gross amount and writes a
    /// PENDING mirror row; fails without side effect when the balance
    /// cannot cover it.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        user_id: UserId,
        symbol: &str,
        amount: Decimal,
        fee: Decimal,
        address: &str,
        memo: Option<String>,
        network: Option<String>,
    ) -> Result<WithdrawalRequest, FundingError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(FundingError::InvalidSymbol(symbol));
        }
        if amount <= Decimal::ZERO {
            return Err(FundingError::InvalidAmount);
        }
        if fee < Decimal::ZERO || fee >= amount {
            return Err(FundingError::InvalidFee);
        }
        let address = address.trim();
        if address.is_empty() {
            return Err(FundingError::InvalidAddress);
        }

        // Hold the gross amount first; an uncovered request dies here.
        self.ledger.reserve(user_id, &symbol, amount).await?;

        let request = WithdrawalRequest::new(
            user_id,
            symbol,
            amount,
            fee,
            address.to_string(),
            memo,
            network,
        );
        let reference = TxKind::Withdrawal.reference(&request.id.to_string());
        let tx = match self.txlog.append(
            reference,
            TxKind::Withdrawal,
            user_id,
            &request.symbol,
            amount,
            TxStatus::Pending,
        ) {
            Ok(tx) => tx,
            Err(e) => {
                // Fresh ids never collide, but if the mirror refuses the
                // row the hold must not outlive the request.
                self.ledger.release(user_id, &request.symbol, amount).await?;
                return Err(e.into());
            }
        };

        self.registry
            .insert(request.id.to_string(), request.clone());
        self.notifier.publish(NotifyEvent::for_transaction(&tx));

        info!(
            request_id = %request.id,
            user_id,
            symbol = %request.symbol,
            amount = %amount,
            fee = %fee,
            "withdrawal request created"
        );
        Ok(request)
    }

    /// Drive one review transition (claim, approve or reject).
    pub async fn decide(
        &self,
        id: &str,
        target: ReviewState,
    ) -> Result<WithdrawalRequest, FundingError> {
        self.registry.transition(id, target, &self.effect).await
    }

    pub async fn get(&self, id: &str) -> Option<WithdrawalRequest> {
        self.registry.get(id).await
    }

    /// One user's requests, newest first.
    pub async fn history(&self, user_id: UserId) -> Vec<WithdrawalRequest> {
        let mut rows = self.registry.filter(|r| r.user_id == user_id).await;
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        rows.truncate(DEFAULT_HISTORY_LIMIT);
        rows
    }

    /// Requests for the admin surface, oldest first. With `status`,
    /// exactly that state; without, everything still awaiting a decision.
    pub async fn review_queue(&self, status: Option<ReviewState>) -> Vec<WithdrawalRequest> {
        let mut rows = match status {
            Some(s) => self.registry.filter(|r| r.state == s).await,
            None => self.registry.filter(|r| !r.state.is_terminal()).await,
        };
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holdings::LedgerError;
    use crate::review::ReviewError;
    use rust_decimal_macros::dec;

    async fn setup_with_balance(amount: Decimal) -> (Arc<HoldingsLedger>, Arc<TransactionLog>, WithdrawService) {
        let ledger = Arc::new(HoldingsLedger::new());
        let txlog = Arc::new(TransactionLog::new());
        let notifier = Notifier::new(64);
        ledger.credit(1, "BTC", amount).await.unwrap();
        let service = WithdrawService::new(ledger.clone(), txlog.clone(), notifier);
        (ledger, txlog, service)
    }

    #[tokio::test]
    async fn test_create_reserves_gross_amount() {
        let (ledger, txlog, service) = setup_with_balance(dec!(10)).await;

        let req = service
            .create(1, "btc", dec!(4), dec!(0.1), "bc1qaddress", None, None)
            .await
            .unwrap();
        assert_eq!(req.symbol, "BTC");
        assert_eq!(req.net_amount(), dec!(3.9));

        let holding = ledger.view(1, "BTC").await.unwrap();
        assert_eq!(holding.amount, dec!(10));
        assert_eq!(holding.locked, dec!(4));
        assert_eq!(holding.available, dec!(6));

        let tx = txlog.get(&format!("WD_{}", req.id)).unwrap();
        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.amount, dec!(4));
    }

    #[tokio::test]
    async fn test_create_rejects_uncovered_request() {
        let (ledger, txlog, service) = setup_with_balance(dec!(1)).await;

        let err = service
            .create(1, "BTC", dec!(5), dec!(0), "bc1qaddress", None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FundingError::Ledger(LedgerError::InsufficientBalance { .. })
        ));

        // Nothing held, nothing mirrored
        let holding = ledger.view(1, "BTC").await.unwrap();
        assert_eq!(holding.locked, dec!(0));
        assert!(txlog.is_empty());
        assert!(service.review_queue(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_validates_fee_and_address() {
        let (_ledger, _txlog, service) = setup_with_balance(dec!(10)).await;

        assert!(matches!(
            service
                .create(1, "BTC", dec!(1), dec!(-0.1), "addr", None, None)
                .await,
            Err(FundingError::InvalidFee)
        ));
        // Fee swallowing the whole amount makes no sense either
        assert!(matches!(
            service
                .create(1, "BTC", dec!(1), dec!(1), "addr", None, None)
                .await,
            Err(FundingError::InvalidFee)
        ));
        assert!(matches!(
            service
                .create(1, "BTC", dec!(1), dec!(0), "   ", None, None)
                .await,
            Err(FundingError::InvalidAddress)
        ));
    }

    #[tokio::test]
    async fn test_approval_settles_the_hold() {
        let (ledger, txlog, service) = setup_with_balance(dec!(10)).await;

        let req = service
            .create(1, "BTC", dec!(4), dec!(0.1), "bc1qaddress", None, None)
            .await
            .unwrap();
        let id = req.id.to_string();

        service.decide(&id, ReviewState::UnderReview).await.unwrap();
        service.decide(&id, ReviewState::Approved).await.unwrap();

        let holding = ledger.view(1, "BTC").await.unwrap();
        assert_eq!(holding.amount, dec!(6));
        assert_eq!(holding.locked, dec!(0));
        assert_eq!(holding.available, dec!(6));

        let tx = txlog.get(&format!("WD_{}", id)).unwrap();
        assert_eq!(tx.status, TxStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_rejection_releases_the_exact_hold() {
        let (ledger, txlog, service) = setup_with_balance(dec!(10)).await;

        let req = service
            .create(1, "BTC", dec!(4), dec!(0.1), "bc1qaddress", None, None)
            .await
            .unwrap();
        let id = req.id.to_string();

        service.decide(&id, ReviewState::Rejected).await.unwrap();

        // Round trip: balances exactly as before the request
        let holding = ledger.view(1, "BTC").await.unwrap();
        assert_eq!(holding.amount, dec!(10));
        assert_eq!(holding.locked, dec!(0));
        assert_eq!(holding.available, dec!(10));

        let tx = txlog.get(&format!("WD_{}", id)).unwrap();
        assert_eq!(tx.status, TxStatus::Failed);
    }

    #[tokio::test]
    async fn test_terminal_decision_is_final() {
        let (ledger, _txlog, service) = setup_with_balance(dec!(10)).await;

        let req = service
            .create(1, "BTC", dec!(4), dec!(0), "bc1qaddress", None, None)
            .await
            .unwrap();
        let id = req.id.to_string();
        service.decide(&id, ReviewState::UnderReview).await.unwrap();
        service.decide(&id, ReviewState::Approved).await.unwrap();

        // Re-approving must not settle twice
        assert!(matches!(
            service.decide(&id, ReviewState::Approved).await,
            Err(FundingError::Review(ReviewError::InvalidTransition { .. }))
        ));
        // Rejecting after approval must not refund
        assert!(matches!(
            service.decide(&id, ReviewState::Rejected).await,
            Err(FundingError::Review(ReviewError::InvalidTransition { .. }))
        ));

        let holding = ledger.view(1, "BTC").await.unwrap();
        assert_eq!(holding.amount, dec!(6));
        assert_eq!(holding.locked, dec!(0));
    }

    #[tokio::test]
    async fn test_two_concurrent_requests_cannot_share_funds() {
        let (ledger, _txlog, service) = setup_with_balance(dec!(100)).await;
        let service = Arc::new(service);

        let a = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create(1, "BTC", dec!(60), dec!(0), "addr-a", None, None)
                    .await
            })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create(1, "BTC", dec!(60), dec!(0), "addr-b", None, None)
                    .await
            })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let won = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(won, 1);

        let holding = ledger.view(1, "BTC").await.unwrap();
        assert_eq!(holding.locked, dec!(60));
        assert_eq!(holding.available, dec!(40));
    }
}
