//! Deposit intake and the ledger consequences of its review decisions.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use super::error::FundingError;
use super::types::DepositRequest;
use crate::core_types::UserId;
use crate::holdings::HoldingsLedger;
use crate::notify::{Notifier, NotifyEvent};
use crate::review::{ReviewEffect, ReviewRegistry, ReviewState};
use crate::txlog::{DEFAULT_HISTORY_LIMIT, TransactionLog, TxKind, TxLogError, TxStatus};

/// What an approval or rejection does besides flipping the state.
pub struct DepositEffect {
    ledger: Arc<HoldingsLedger>,
    txlog: Arc<TransactionLog>,
    notifier: Notifier,
}

#[async_trait]
impl ReviewEffect<DepositRequest> for DepositEffect {
    type Error = FundingError;

    async fn apply(
        &self,
        request: &DepositRequest,
        _from: ReviewState,
        to: ReviewState,
    ) -> Result<(), FundingError> {
        let reference = TxKind::Deposit.reference(&request.id.to_string());
        match to {
            ReviewState::Approved => {
                // The mirror row was written when the request was created.
                // A missing row means the stores disagree, and nothing may
                // be credited until that is resolved.
                if !self.txlog.contains(&reference) {
                    return Err(TxLogError::ReferenceNotFound(reference).into());
                }
                self.ledger
                    .credit(request.user_id, &request.symbol, request.amount)
                    .await?;
                let tx = self.txlog.update_status(&reference, TxStatus::Confirmed)?;
                self.notifier.publish(NotifyEvent::for_transaction(&tx));
            }
            ReviewState::Rejected => {
                let tx = self.txlog.update_status(&reference, TxStatus::Failed)?;
                self.notifier.publish(NotifyEvent::for_transaction(&tx));
            }
            // Claiming a request for review moves no funds
            ReviewState::Pending | ReviewState::UnderReview => {}
        }
        Ok(())
    }
}

pub struct DepositService {
    registry: ReviewRegistry<DepositRequest>,
    effect: DepositEffect,
    txlog: Arc<TransactionLog>,
    notifier: Notifier,
}

impl DepositService {
    pub fn new(
        ledger: Arc<HoldingsLedger>,
        txlog: Arc<TransactionLog>,
        notifier: Notifier,
    ) -> Self {
        Self {
            registry: ReviewRegistry::new(),
            effect: DepositEffect {
                ledger,
                txlog: txlog.clone(),
                notifier: notifier.clone(),
            },
            txlog,
            notifier,
        }
    }

    /// Announce an incoming deposit. Funds stay untouched until the
    /// request is approved; a PENDING mirror row appears immediately.
    pub async fn create(
        &self,
        user_id: UserId,
        symbol: &str,
        amount: Decimal,
        external_ref: Option<String>,
    ) -> Result<DepositRequest, FundingError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(FundingError::InvalidSymbol(symbol));
        }
        if amount <= Decimal::ZERO {
            return Err(FundingError::InvalidAmount);
        }

        let request = DepositRequest::new(user_id, symbol, amount, external_ref);
        let reference = TxKind::Deposit.reference(&request.id.to_string());
        let tx = self.txlog.append(
            reference,
            TxKind::Deposit,
            user_id,
            &request.symbol,
            amount,
            TxStatus::Pending,
        )?;

        self.registry
            .insert(request.id.to_string(), request.clone());
        self.notifier.publish(NotifyEvent::for_transaction(&tx));

        info!(
            request_id = %request.id,
            user_id,
            symbol = %request.symbol,
            amount = %amount,
            "deposit request created"
        );
        Ok(request)
    }

    /// Drive one review transition (claim, approve or reject).
    pub async fn decide(
        &self,
        id: &str,
        target: ReviewState,
    ) -> Result<DepositRequest, FundingError> {
        self.registry.transition(id, target, &self.effect).await
    }

    pub async fn get(&self, id: &str) -> Option<DepositRequest> {
        self.registry.get(id).await
    }

    /// One user's requests, newest first.
    pub async fn history(&self, user_id: UserId) -> Vec<DepositRequest> {
        let mut rows = self.registry.filter(|r| r.user_id == user_id).await;
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        rows.truncate(DEFAULT_HISTORY_LIMIT);
        rows
    }

    /// Requests for the admin surface, oldest first. With `status`,
    /// exactly that state; without, everything still awaiting a decision.
    pub async fn review_queue(&self, status: Option<ReviewState>) -> Vec<DepositRequest> {
        let mut rows = match status {
            Some(s) => self.registry.filter(|r| r.state == s).await,
            None => self.registry.filter(|r| !r.state.is_terminal()).await,
        };
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }
}
