//! Reviewed funding flows: deposits credit on approval, withdrawals
//! hold the gross amount from the moment they are requested.

pub mod deposit;
pub mod error;
pub mod handlers;
pub mod types;
pub mod withdraw;

// Re-exports for convenience
pub use deposit::{DepositEffect, DepositService};
pub use error::FundingError;
pub use types::{DepositRequest, DepositView, RequestId, WithdrawalRequest, WithdrawalView};
pub use withdraw::{WithdrawService, WithdrawalEffect};
