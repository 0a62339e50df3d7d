use rust_decimal::Decimal;
use serde::Serialize;

use crate::core_types::Symbol;
use crate::holdings::HoldingView;

/// A priced conversion offer. Informational only; nothing is held and
/// execution re-prices against the market at its own time.
#[derive(Debug, Clone, Serialize)]
pub struct SwapQuote {
    pub from: Symbol,
    pub to: Symbol,
    pub amount_in: Decimal,
    pub price_from: Decimal,
    pub price_to: Decimal,
    pub fee_pct: Decimal,
    /// Output before the fee
    pub gross_out: Decimal,
    /// Output after the fee, rounded down to 8 decimals
    pub amount_out: Decimal,
    pub quoted_at: i64,
}

/// Result of an executed swap.
#[derive(Debug, Clone, Serialize)]
pub struct SwapReceipt {
    pub reference: String,
    pub from: Symbol,
    pub to: Symbol,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub from_balance: HoldingView,
    pub to_balance: HoldingView,
    pub executed_at: i64,
}
