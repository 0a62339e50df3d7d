//! Mock endpoints for development and QA builds
//!
//! Only compiled with the `mock-api` feature. Lets test tooling seed
//! balances directly, without standing up a funding upstream or walking
//! a request through review.

use std::str::FromStr;
use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use ulid::Ulid;

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};
use crate::holdings::HoldingView;
use crate::notify::NotifyEvent;
use crate::txlog::{TxKind, TxStatus};

#[derive(Debug, Deserialize)]
pub struct MockCreditRequest {
    pub user_id: u64,
    pub symbol: String,
    pub amount: String,
}

/// Credit a holding directly
///
/// POST /internal/mock/credit
///
/// Writes a CONFIRMED deposit row to the mirror so account history stays
/// coherent in dev runs.
pub async fn mock_credit(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<MockCreditRequest>,
) -> Result<Json<ApiResponse<HoldingView>>, (StatusCode, Json<ApiResponse<()>>)> {
    let secret = headers
        .get("X-Internal-Secret")
        .and_then(|v| v.to_str().ok());
    if secret != Some("dev-secret") {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Access Denied: Missing or Invalid X-Internal-Secret",
            )),
        ));
    }

    let amount = Decimal::from_str(&req.amount).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "Invalid amount",
            )),
        )
    })?;

    let symbol = req.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "Missing symbol",
            )),
        ));
    }

    let view = state
        .ledger
        .credit(req.user_id, &symbol, amount)
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(
                    error_codes::INVALID_PARAMETER,
                    e.to_string(),
                )),
            )
        })?;

    let reference = TxKind::Deposit.reference(&Ulid::new().to_string());
    match state.txlog.append(
        reference,
        TxKind::Deposit,
        req.user_id,
        &symbol,
        amount,
        TxStatus::Confirmed,
    ) {
        Ok(tx) => state.notifier.publish(NotifyEvent::for_transaction(&tx)),
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    e.to_string(),
                )),
            ));
        }
    }

    Ok(Json(ApiResponse::success(view)))
}
