//! Price lookup handler

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use rustc_hash::FxHashMap;

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};
use crate::core_types::Symbol;
use crate::prices::PricePoint;

/// Spot price lookup
///
/// GET /api/v1/prices?symbols=BTC,ETH,USDT
///
/// Returns USD quotes from the TTL cache. Symbols the upstream does not
/// quote are omitted from the map rather than reported as errors.
pub async fn get_prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Result<Json<ApiResponse<FxHashMap<Symbol, PricePoint>>>, (StatusCode, Json<ApiResponse<()>>)>
{
    let raw = params.get("symbols").map(|s| s.as_str()).unwrap_or("");
    let symbols: Vec<Symbol> = raw
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "Missing or empty symbols parameter",
            )),
        ));
    }

    let prices = state.prices.get_prices(&symbols).await;
    Ok(Json(ApiResponse::success(prices)))
}
