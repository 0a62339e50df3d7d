//! Shared application state for the HTTP gateway
//!
//! All services are wrapped in `Arc` so the state can be cloned cheaply
//! into every request handler.

use std::sync::Arc;

use crate::funding::{DepositService, WithdrawService};
use crate::holdings::HoldingsLedger;
use crate::notify::Notifier;
use crate::prices::PriceCache;
use crate::swap::SwapEngine;
use crate::txlog::TransactionLog;

/// Shared state handed to every handler via `State<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    /// Per-user holdings ledger
    pub ledger: Arc<HoldingsLedger>,
    /// Deposit review workflow
    pub deposits: Arc<DepositService>,
    /// Withdrawal review workflow
    pub withdrawals: Arc<WithdrawService>,
    /// Asset conversion engine
    pub swap: Arc<SwapEngine>,
    /// TTL price cache
    pub prices: Arc<PriceCache>,
    /// Transaction read model
    pub txlog: Arc<TransactionLog>,
    /// Notification fan-in queue
    pub notifier: Notifier,
    /// Shared secret for the admin review surface
    pub admin_secret: String,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<HoldingsLedger>,
        deposits: Arc<DepositService>,
        withdrawals: Arc<WithdrawService>,
        swap: Arc<SwapEngine>,
        prices: Arc<PriceCache>,
        txlog: Arc<TransactionLog>,
        notifier: Notifier,
        admin_secret: String,
    ) -> Self {
        Self {
            ledger,
            deposits,
            withdrawals,
            swap,
            prices,
            txlog,
            notifier,
            admin_secret,
        }
    }
}
