//! Request authentication for the HTTP gateway
//!
//! User endpoints identify the caller via the `X-User-Id` header.
//! The admin review surface is guarded by an `X-Admin-Secret` shared
//! with the operator deployment.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::core_types::UserId;

use super::state::AppState;
use super::types::{ApiResponse, error_codes};

/// Header identifying the requesting user.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the admin shared secret.
pub const ADMIN_SECRET_HEADER: &str = "X-Admin-Secret";

/// Authenticated user injected into request extensions by [`require_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// Middleware for the user API surface.
///
/// Rejects requests without a parseable positive `X-User-Id` and injects
/// [`AuthUser`] into the request extensions for downstream handlers.
pub async fn require_user(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    let header = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::MISSING_AUTH,
                "Missing X-User-Id header",
            )),
        ))?;

    match header.trim().parse::<UserId>() {
        Ok(user_id) if user_id > 0 => {
            request.extensions_mut().insert(AuthUser(user_id));
            Ok(next.run(request).await)
        }
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid X-User-Id header",
            )),
        )),
    }
}

/// Middleware for the admin review surface.
///
/// Requires `X-Admin-Secret` to match the configured secret.
pub async fn admin_guard(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    let secret = request
        .headers()
        .get(ADMIN_SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::MISSING_AUTH,
                "Missing X-Admin-Secret header",
            )),
        ))?;

    if secret != state.admin_secret {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Admin secret mismatch",
            )),
        ));
    }

    Ok(next.run(request).await)
}
