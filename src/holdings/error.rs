use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from holding balance mutations.
///
/// `InsufficientLocked` indicates a workflow bug (release/settle without a
/// matching reserve) rather than user error; it is never surfaced as a
/// client-facing validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid amount: must be positive")]
    InvalidAmount,

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Insufficient locked funds: locked {locked}, requested {requested}")]
    InsufficientLocked { locked: Decimal, requested: Decimal },

    #[error("Balance arithmetic overflow")]
    Overflow,
}
