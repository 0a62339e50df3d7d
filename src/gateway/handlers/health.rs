//! Health check handler

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, http::StatusCode};

use super::super::types::ApiResponse;

/// Health check response data
#[derive(serde::Serialize)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Short git revision baked in at build time
    pub build: &'static str,
}

/// Health check endpoint
///
/// The service holds all state in memory, so liveness is the only
/// signal worth reporting.
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, build}}
pub async fn health_check() -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthResponse {
            timestamp_ms: now_ms,
            build: env!("GIT_HASH"),
        })),
    )
}
