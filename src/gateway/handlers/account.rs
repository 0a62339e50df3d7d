//! Account handlers (balances, transaction history)

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
};

use super::super::auth::AuthUser;
use super::super::state::AppState;
use super::super::types::ApiResponse;
use crate::holdings::HoldingView;
use crate::txlog::{DEFAULT_HISTORY_LIMIT, Transaction};

/// Get all holdings for the authenticated user
///
/// GET /api/v1/account/balances
///
/// Rows are sorted by symbol. Symbols the user never touched are absent.
pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ApiResponse<Vec<HoldingView>>> {
    let balances = state.ledger.balances(user.0).await;
    Json(ApiResponse::success(balances))
}

/// Get recent transactions for the authenticated user, newest first
///
/// GET /api/v1/account/history?limit=20
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Json<ApiResponse<Vec<Transaction>>> {
    let limit: usize = params
        .get("limit")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    let rows = state.txlog.history(user.0, limit);
    Json(ApiResponse::success(rows))
}
