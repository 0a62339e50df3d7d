use axum::{Extension, Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::gateway::auth::AuthUser;
use crate::gateway::{state::AppState, types::ApiResponse, types::error_codes};
use crate::holdings::LedgerError;

use super::engine::SwapError;
use super::types::{SwapQuote, SwapReceipt};

// --- Requests ---

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
    /// Slippage floor; omitting it accepts any output
    pub min_receive: Option<String>,
}

// --- Error mapping ---

type HandlerError = (StatusCode, Json<ApiResponse<()>>);

fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, HandlerError> {
    Decimal::from_str(value.trim()).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                format!("Invalid {}", field),
            )),
        )
    })
}

fn swap_error_response(e: SwapError) -> HandlerError {
    let (status, code) = match &e {
        SwapError::InvalidAmount
        | SwapError::AmountTooSmall
        | SwapError::EmptySymbol(_)
        | SwapError::SameAsset(_) => (StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER),
        SwapError::PriceUnavailable(_) => (StatusCode::CONFLICT, error_codes::PRICE_UNAVAILABLE),
        SwapError::SlippageExceeded { .. } => {
            (StatusCode::CONFLICT, error_codes::SLIPPAGE_EXCEEDED)
        }
        SwapError::Ledger(LedgerError::InsufficientBalance { .. }) => {
            (StatusCode::BAD_REQUEST, error_codes::INSUFFICIENT_BALANCE)
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
        ),
    };
    (status, Json(ApiResponse::<()>::error(code, e.to_string())))
}

// --- Handlers ---

/// Price a conversion
/// POST /api/v1/swap/quote
pub async fn quote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<SwapQuote>>, HandlerError> {
    let amount = parse_decimal("amount", &req.amount)?;

    match state.swap.quote(&req.from, &req.to, amount).await {
        Ok(quote) => Ok(Json(ApiResponse::success(quote))),
        Err(e) => Err(swap_error_response(e)),
    }
}

/// Execute a conversion
/// POST /api/v1/swap/execute
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ApiResponse<SwapReceipt>>, HandlerError> {
    let amount = parse_decimal("amount", &req.amount)?;
    let min_receive = parse_decimal("min_receive", req.min_receive.as_deref().unwrap_or("0"))?;

    match state
        .swap
        .execute(user.0, &req.from, &req.to, amount, min_receive)
        .await
    {
        Ok(receipt) => Ok(Json(ApiResponse::success(receipt))),
        Err(e) => Err(swap_error_response(e)),
    }
}
