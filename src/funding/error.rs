use thiserror::Error;

use crate::holdings::LedgerError;
use crate::review::ReviewError;
use crate::txlog::TxLogError;

#[derive(Debug, Error)]
pub enum FundingError {
    #[error("Invalid amount: must be positive")]
    InvalidAmount,

    #[error("Invalid fee: must be non-negative and below the amount")]
    InvalidFee,

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    #[error("Mirror error: {0}")]
    Mirror(#[from] TxLogError),
}
