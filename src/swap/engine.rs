//! Asset-to-asset conversion priced over USD quotes.
//!
//! Quoting never touches balances. Execution re-prices, applies the
//! caller's slippage floor, then moves both legs through the ledger in
//! one atomic conversion and mirrors the trade as a TRANSFER row.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::types::{SwapQuote, SwapReceipt};
use crate::core_types::{Symbol, UserId};
use crate::holdings::{HoldingsLedger, LedgerError};
use crate::notify::{Notifier, NotifyEvent};
use crate::prices::{PriceCache, PricePoint};
use crate::txlog::{TransactionLog, TxKind, TxLogError, TxStatus};

/// Output scale. Quotes are truncated, never rounded up.
const OUTPUT_DECIMALS: u32 = 8;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("Invalid amount: must be positive")]
    InvalidAmount,

    #[error("Amount too small: output truncates to zero")]
    AmountTooSmall,

    #[error("Empty {0} symbol")]
    EmptySymbol(&'static str),

    #[error("Cannot swap {0} into itself")]
    SameAsset(Symbol),

    #[error("Price unavailable for {0}")]
    PriceUnavailable(Symbol),

    #[error("Slippage exceeded: wanted at least {min_receive}, would receive {actual}")]
    SlippageExceeded {
        min_receive: Decimal,
        actual: Decimal,
    },

    #[error("Numeric overflow in conversion")]
    Overflow,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Mirror error: {0}")]
    Mirror(#[from] TxLogError),
}

pub struct SwapEngine {
    ledger: Arc<HoldingsLedger>,
    prices: Arc<PriceCache>,
    txlog: Arc<TransactionLog>,
    notifier: Notifier,
    fee_pct: Decimal,
}

/// Positive USD price for `symbol`, or `PriceUnavailable`.
fn price_of(prices: &FxHashMap<Symbol, PricePoint>, symbol: &str) -> Result<Decimal, SwapError> {
    match prices.get(symbol) {
        Some(point) if point.price_usd > Decimal::ZERO => Ok(point.price_usd),
        _ => Err(SwapError::PriceUnavailable(symbol.to_string())),
    }
}

impl SwapEngine {
    pub fn new(
        ledger: Arc<HoldingsLedger>,
        prices: Arc<PriceCache>,
        txlog: Arc<TransactionLog>,
        notifier: Notifier,
        fee_pct: Decimal,
    ) -> Self {
        Self {
            ledger,
            prices,
            txlog,
            notifier,
            fee_pct,
        }
    }

    pub fn fee_pct(&self) -> Decimal {
        self.fee_pct
    }

    fn validate(&self, from: &str, to: &str, amount_in: Decimal) -> Result<(Symbol, Symbol), SwapError> {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        if from.is_empty() {
            return Err(SwapError::EmptySymbol("from"));
        }
        if to.is_empty() {
            return Err(SwapError::EmptySymbol("to"));
        }
        if from == to {
            return Err(SwapError::SameAsset(from));
        }
        if amount_in <= Decimal::ZERO {
            return Err(SwapError::InvalidAmount);
        }
        Ok((from, to))
    }

    /// gross = amount_in * price_from / price_to
    /// net   = gross * (1 - fee), truncated to the output scale
    ///
    /// A positive input can still truncate to zero output (dust against a
    /// much pricier asset); such requests are refused here, so neither
    /// quoting nor execution ever proceeds with a zero net.
    fn convert_amounts(
        &self,
        amount_in: Decimal,
        price_from: Decimal,
        price_to: Decimal,
    ) -> Result<(Decimal, Decimal), SwapError> {
        let gross = amount_in
            .checked_mul(price_from)
            .and_then(|v| v.checked_div(price_to))
            .ok_or(SwapError::Overflow)?;
        let net = gross
            .checked_mul(Decimal::ONE - self.fee_pct)
            .ok_or(SwapError::Overflow)?
            .round_dp_with_strategy(OUTPUT_DECIMALS, RoundingStrategy::ToZero);
        if net <= Decimal::ZERO {
            return Err(SwapError::AmountTooSmall);
        }
        Ok((gross, net))
    }

    /// Price a conversion without touching any balance.
    pub async fn quote(
        &self,
        from: &str,
        to: &str,
        amount_in: Decimal,
    ) -> Result<SwapQuote, SwapError> {
        let (from, to) = self.validate(from, to, amount_in)?;

        let prices = self.prices.get_prices(&[from.clone(), to.clone()]).await;
        let price_from = price_of(&prices, &from)?;
        let price_to = price_of(&prices, &to)?;
        let (gross_out, amount_out) = self.convert_amounts(amount_in, price_from, price_to)?;

        Ok(SwapQuote {
            from,
            to,
            amount_in,
            price_from,
            price_to,
            fee_pct: self.fee_pct,
            gross_out,
            amount_out,
            quoted_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Execute a conversion. Prices are re-read here; when the resulting
    /// output falls below `min_receive` nothing moves. The mirror row is
    /// written PENDING before the ledger moves and flipped CONFIRMED
    /// after, so an attempt that dies in the ledger stays visible as
    /// FAILED.
    pub async fn execute(
        &self,
        user_id: UserId,
        from: &str,
        to: &str,
        amount_in: Decimal,
        min_receive: Decimal,
    ) -> Result<SwapReceipt, SwapError> {
        let (from, to) = self.validate(from, to, amount_in)?;
        if min_receive < Decimal::ZERO {
            return Err(SwapError::InvalidAmount);
        }

        let prices = self.prices.get_prices(&[from.clone(), to.clone()]).await;
        let price_from = price_of(&prices, &from)?;
        let price_to = price_of(&prices, &to)?;
        let (_, amount_out) = self.convert_amounts(amount_in, price_from, price_to)?;

        if amount_out < min_receive {
            return Err(SwapError::SlippageExceeded {
                min_receive,
                actual: amount_out,
            });
        }

        let reference = TxKind::Transfer.reference(&Uuid::new_v4().to_string());
        let pair = format!("{}->{}", from, to);
        self.txlog.append(
            reference.clone(),
            TxKind::Transfer,
            user_id,
            &pair,
            amount_in,
            TxStatus::Pending,
        )?;

        let (from_balance, to_balance) = match self
            .ledger
            .convert(user_id, &from, amount_in, &to, amount_out)
            .await
        {
            Ok(views) => views,
            Err(e) => {
                // Funds never moved; keep the attempt visible.
                if let Err(mirror_err) = self.txlog.update_status(&reference, TxStatus::Failed) {
                    error!(
                        reference = %reference,
                        error = %mirror_err,
                        "swap mirror row stuck PENDING after failed conversion"
                    );
                }
                return Err(e.into());
            }
        };

        let tx = self.txlog.update_status(&reference, TxStatus::Confirmed)?;
        self.notifier.publish(NotifyEvent::for_transaction(&tx));

        info!(
            user_id,
            reference = %reference,
            pair = %pair,
            amount_in = %amount_in,
            amount_out = %amount_out,
            "swap executed"
        );

        Ok(SwapReceipt {
            reference,
            from,
            to,
            amount_in,
            amount_out,
            from_balance,
            to_balance,
            executed_at: chrono::Utc::now().timestamp_millis(),
        })
    }
}
