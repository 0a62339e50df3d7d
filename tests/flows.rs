//! End-to-end flows through the public crate API: deposits and
//! withdrawals moving through review, and swaps settling both legs.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use custodia::funding::{DepositService, FundingError, WithdrawService};
use custodia::holdings::{HoldingsLedger, LedgerError};
use custodia::notify::{CollectingSink, Notifier, NotifyService};
use custodia::prices::{ManualClock, PriceCache, StaticPriceSource};
use custodia::review::ReviewState;
use custodia::swap::SwapEngine;
use custodia::txlog::{TransactionLog, TxStatus};

struct Stack {
    ledger: Arc<HoldingsLedger>,
    txlog: Arc<TransactionLog>,
    notifier: Notifier,
    deposits: DepositService,
    withdrawals: WithdrawService,
}

/// Wire up the full service stack on a fresh in-memory ledger.
fn stack() -> Stack {
    let ledger = Arc::new(HoldingsLedger::new());
    let txlog = Arc::new(TransactionLog::new());
    let notifier = Notifier::new(64);
    let deposits = DepositService::new(ledger.clone(), txlog.clone(), notifier.clone());
    let withdrawals = WithdrawService::new(ledger.clone(), txlog.clone(), notifier.clone());
    Stack {
        ledger,
        txlog,
        notifier,
        deposits,
        withdrawals,
    }
}

#[tokio::test]
async fn deposit_held_until_review_approves() {
    let s = stack();

    let req = s
        .deposits
        .create(7, "btc", dec!(1.5), Some("0xabc".into()))
        .await
        .unwrap();
    let id = req.id.to_string();

    // Announced but not approved: nothing lands on the balance yet.
    assert!(s.ledger.view(7, "BTC").await.is_none());
    let reference = s.txlog.history(7, 10)[0].reference.clone();
    assert!(reference.starts_with("DEP_"));
    assert_eq!(s.txlog.get(&reference).unwrap().status, TxStatus::Pending);

    s.deposits
        .decide(&id, ReviewState::UnderReview)
        .await
        .unwrap();
    let approved = s.deposits.decide(&id, ReviewState::Approved).await.unwrap();
    assert_eq!(approved.state, ReviewState::Approved);

    let view = s.ledger.view(7, "BTC").await.unwrap();
    assert_eq!(view.amount, dec!(1.5));
    assert_eq!(view.locked, dec!(0));
    assert_eq!(s.txlog.get(&reference).unwrap().status, TxStatus::Confirmed);
}

#[tokio::test]
async fn terminal_review_is_final() {
    let s = stack();

    let req = s.deposits.create(7, "ETH", dec!(2), None).await.unwrap();
    let id = req.id.to_string();
    s.deposits
        .decide(&id, ReviewState::UnderReview)
        .await
        .unwrap();
    s.deposits.decide(&id, ReviewState::Approved).await.unwrap();

    // A second decision must fail and must not credit again.
    assert!(s.deposits.decide(&id, ReviewState::Approved).await.is_err());
    assert!(s.deposits.decide(&id, ReviewState::Rejected).await.is_err());
    assert_eq!(s.ledger.view(7, "ETH").await.unwrap().amount, dec!(2));
}

#[tokio::test]
async fn fast_reject_skips_screening() {
    let s = stack();

    let req = s.deposits.create(9, "BTC", dec!(0.4), None).await.unwrap();

    // PENDING -> REJECTED directly, without passing through UNDER_REVIEW.
    let rejected = s
        .deposits
        .decide(&req.id.to_string(), ReviewState::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.state, ReviewState::Rejected);

    assert!(s.ledger.view(9, "BTC").await.is_none());
    assert_eq!(s.txlog.history(9, 10)[0].status, TxStatus::Failed);
}

#[tokio::test]
async fn withdrawal_holds_then_settles() {
    let s = stack();
    s.ledger.credit(3, "USDT", dec!(100)).await.unwrap();

    let req = s
        .withdrawals
        .create(3, "USDT", dec!(40), dec!(0.5), "TAddr99", None, None)
        .await
        .unwrap();
    let id = req.id.to_string();

    // The gross amount is held while the request sits in review.
    let view = s.ledger.view(3, "USDT").await.unwrap();
    assert_eq!(view.locked, dec!(40));
    assert_eq!(view.available, dec!(60));

    s.withdrawals
        .decide(&id, ReviewState::UnderReview)
        .await
        .unwrap();
    s.withdrawals
        .decide(&id, ReviewState::Approved)
        .await
        .unwrap();

    let view = s.ledger.view(3, "USDT").await.unwrap();
    assert_eq!(view.amount, dec!(60));
    assert_eq!(view.locked, dec!(0));

    let row = &s.txlog.history(3, 10)[0];
    assert!(row.reference.starts_with("WD_"));
    assert_eq!(row.status, TxStatus::Confirmed);
}

#[tokio::test]
async fn withdrawal_reject_restores_funds() {
    let s = stack();
    s.ledger.credit(3, "USDT", dec!(100)).await.unwrap();

    let req = s
        .withdrawals
        .create(3, "USDT", dec!(40), dec!(1), "TAddr99", None, None)
        .await
        .unwrap();
    s.withdrawals
        .decide(&req.id.to_string(), ReviewState::Rejected)
        .await
        .unwrap();

    let view = s.ledger.view(3, "USDT").await.unwrap();
    assert_eq!(view.amount, dec!(100));
    assert_eq!(view.locked, dec!(0));
    assert_eq!(s.txlog.history(3, 10)[0].status, TxStatus::Failed);
}

#[tokio::test]
async fn withdrawal_rejected_without_cover() {
    let s = stack();
    s.ledger.credit(4, "USDT", dec!(10)).await.unwrap();

    let err = s
        .withdrawals
        .create(4, "USDT", dec!(25), dec!(0), "TAddr00", None, None)
        .await;
    assert!(matches!(
        err,
        Err(FundingError::Ledger(
            LedgerError::InsufficientBalance { .. }
        ))
    ));

    // No hold, no request, no mirror row.
    let view = s.ledger.view(4, "USDT").await.unwrap();
    assert_eq!(view.locked, dec!(0));
    assert!(s.withdrawals.review_queue(None).await.is_empty());
    assert!(s.txlog.history(4, 10).is_empty());
}

#[tokio::test]
async fn swap_settles_both_legs_atomically() {
    let s = stack();
    s.ledger.credit(5, "USDT", dec!(2000)).await.unwrap();

    let source = Arc::new(StaticPriceSource::new());
    source.set_price("ETH", dec!(2000));
    source.set_price("USDT", dec!(1));
    let clock = Arc::new(ManualClock::new());
    let prices = Arc::new(PriceCache::with_clock(
        source,
        Duration::from_secs(60),
        clock,
    ));

    let swap = SwapEngine::new(
        s.ledger.clone(),
        prices,
        s.txlog.clone(),
        s.notifier.clone(),
        dec!(0.0035),
    );

    let receipt = swap
        .execute(5, "USDT", "ETH", dec!(2000), dec!(0))
        .await
        .unwrap();

    // 2000 USDT at 1:2000 is 1 ETH gross, 0.9965 ETH after the fee.
    assert_eq!(receipt.amount_out, dec!(0.9965));
    assert_eq!(receipt.from_balance.amount, dec!(0));
    assert_eq!(receipt.to_balance.amount, dec!(0.9965));

    let row = &s.txlog.history(5, 10)[0];
    assert!(row.reference.starts_with("SWAP_"));
    assert_eq!(row.status, TxStatus::Confirmed);
}

#[tokio::test]
async fn notifications_reach_the_sink() {
    let s = stack();

    let req = s.deposits.create(11, "BTC", dec!(1), None).await.unwrap();
    let id = req.id.to_string();
    s.deposits
        .decide(&id, ReviewState::UnderReview)
        .await
        .unwrap();
    s.deposits.decide(&id, ReviewState::Approved).await.unwrap();

    let sink = Arc::new(CollectingSink::new());
    let service = NotifyService::new(s.notifier.clone(), sink.clone());
    let delivered = service.drain().await;

    // Creation and approval each queue one event.
    assert_eq!(delivered, 2);
    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].user_id, 11);
    assert_eq!(events[0].status, TxStatus::Pending);
    assert_eq!(events[1].status, TxStatus::Confirmed);
}
