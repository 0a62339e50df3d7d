use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::gateway::auth::AuthUser;
use crate::gateway::{state::AppState, types::ApiResponse, types::error_codes};
use crate::holdings::LedgerError;
use crate::review::{ReviewError, ReviewState};

use super::error::FundingError;
use super::types::{DepositView, WithdrawalView};

// --- Requests ---

#[derive(Debug, Deserialize)]
pub struct CreateDepositRequest {
    pub symbol: String,
    pub amount: String,
    /// External reference (tx hash, wire id)
    pub external_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWithdrawalRequest {
    pub symbol: String,
    pub amount: String,
    pub fee: Option<String>,
    pub address: String,
    pub memo: Option<String>,
    pub network: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub target: ReviewState,
}

// --- Responses ---

#[derive(Debug, Serialize)]
pub struct ReviewQueueResponse<T> {
    pub total: usize,
    pub requests: Vec<T>,
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

fn parse_status_filter(params: &HashMap<String, String>) -> Result<Option<ReviewState>, HandlerError> {
    match params.get("status") {
        None => Ok(None),
        Some(raw) => raw.parse::<ReviewState>().map(Some).map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(
                    error_codes::INVALID_PARAMETER,
                    format!("Unknown review status: {}", raw),
                )),
            )
        }),
    }
}

fn funding_error_response(e: FundingError) -> HandlerError {
    let (status, code) = match &e {
        FundingError::InvalidAmount
        | FundingError::InvalidFee
        | FundingError::InvalidAddress
        | FundingError::InvalidSymbol(_)
        | FundingError::Ledger(LedgerError::InvalidAmount) => {
            (StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER)
        }
        FundingError::Ledger(LedgerError::InsufficientBalance { .. }) => {
            (StatusCode::BAD_REQUEST, error_codes::INSUFFICIENT_BALANCE)
        }
        FundingError::Review(ReviewError::InvalidTransition { .. }) => {
            (StatusCode::BAD_REQUEST, error_codes::INVALID_STATE)
        }
        FundingError::Review(ReviewError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, error_codes::REQUEST_NOT_FOUND)
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
        ),
    };
    (status, Json(ApiResponse::<()>::error(code, e.to_string())))
}

// --- User handlers ---

/// Announce an incoming deposit
/// POST /api/v1/funding/deposit
pub async fn create_deposit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateDepositRequest>,
) -> Result<Json<ApiResponse<DepositView>>, HandlerError> {
    let amount = parse_decimal("amount", &req.amount)?;

    match state
        .deposits
        .create(user.0, &req.symbol, amount, req.external_ref)
        .await
    {
        Ok(request) => Ok(Json(ApiResponse::success(DepositView::from(&request)))),
        Err(e) => Err(funding_error_response(e)),
    }
}

/// My deposit requests, newest first
/// GET /api/v1/funding/deposits
pub async fn list_deposits(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ApiResponse<Vec<DepositView>>> {
    let views = state
        .deposits
        .history(user.0)
        .await
        .iter()
        .map(DepositView::from)
        .collect();
    Json(ApiResponse::success(views))
}

/// Request a withdrawal
/// POST /api/v1/funding/withdraw
pub async fn create_withdrawal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateWithdrawalRequest>,
) -> Result<Json<ApiResponse<WithdrawalView>>, HandlerError> {
    let amount = parse_decimal("amount", &req.amount)?;
    let fee = parse_decimal("fee", req.fee.as_deref().unwrap_or("0"))?;

    match state
        .withdrawals
        .create(
            user.0,
            &req.symbol,
            amount,
            fee,
            &req.address,
            req.memo,
            req.network,
        )
        .await
    {
        Ok(request) => Ok(Json(ApiResponse::success(WithdrawalView::from(&request)))),
        Err(e) => Err(funding_error_response(e)),
    }
}

/// My withdrawal requests, newest first
/// GET /api/v1/funding/withdrawals
pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ApiResponse<Vec<WithdrawalView>>> {
    let views = state
        .withdrawals
        .history(user.0)
        .await
        .iter()
        .map(WithdrawalView::from)
        .collect();
    Json(ApiResponse::success(views))
}

// --- Admin handlers (mounted behind the admin-secret guard) ---

/// Deposits awaiting a decision, or all deposits in one state via `?status=`
/// GET /admin/v1/review/deposits
pub async fn review_deposit_queue(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<ReviewQueueResponse<DepositView>>>, HandlerError> {
    let status = parse_status_filter(&params)?;
    let requests: Vec<DepositView> = state
        .deposits
        .review_queue(status)
        .await
        .iter()
        .map(DepositView::from)
        .collect();
    Ok(Json(ApiResponse::success(ReviewQueueResponse {
        total: requests.len(),
        requests,
    })))
}

/// Move a deposit request through the review machine
/// POST /admin/v1/review/deposits/{id}
pub async fn decide_deposit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DecideRequest>,
) -> Result<Json<ApiResponse<DepositView>>, HandlerError> {
    match state.deposits.decide(&id, req.target).await {
        Ok(request) => Ok(Json(ApiResponse::success(DepositView::from(&request)))),
        Err(e) => Err(funding_error_response(e)),
    }
}

/// Withdrawals awaiting a decision, or all withdrawals in one state via `?status=`
/// GET /admin/v1/review/withdrawals
pub async fn review_withdrawal_queue(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<ReviewQueueResponse<WithdrawalView>>>, HandlerError> {
    let status = parse_status_filter(&params)?;
    let requests: Vec<WithdrawalView> = state
        .withdrawals
        .review_queue(status)
        .await
        .iter()
        .map(WithdrawalView::from)
        .collect();
    Ok(Json(ApiResponse::success(ReviewQueueResponse {
        total: requests.len(),
        requests,
    })))
}

/// Move a withdrawal request through the review machine
/// POST /admin/v1/review/withdrawals/{id}
pub async fn decide_withdrawal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DecideRequest>,
) -> Result<Json<ApiResponse<WithdrawalView>>, HandlerError> {
    match state.withdrawals.decide(&id, req.target).await {
        Ok(request) => Ok(Json(ApiResponse::success(WithdrawalView::from(&request)))),
        Err(e) => Err(funding_error_response(e)),
    }
}
