pub mod auth;
pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use auth::{admin_guard, require_user};
use state::AppState;

/// Start HTTP Gateway server
pub async fn run_server(config: &GatewayConfig, state: AppState) {
    let state = Arc::new(state);

    // ==========================================================================
    // User Routes - caller identified by X-User-Id
    // ==========================================================================
    let user_routes = Router::new()
        // Account queries
        .route("/account/balances", get(handlers::get_balances))
        .route("/account/history", get(handlers::get_history))
        // Funding requests
        .route(
            "/funding/deposit",
            post(crate::funding::handlers::create_deposit),
        )
        .route(
            "/funding/deposits",
            get(crate::funding::handlers::list_deposits),
        )
        .route(
            "/funding/withdraw",
            post(crate::funding::handlers::create_withdrawal),
        )
        .route(
            "/funding/withdrawals",
            get(crate::funding::handlers::list_withdrawals),
        )
        // Asset conversion
        .route("/swap/quote", post(crate::swap::handlers::quote))
        .route("/swap/execute", post(crate::swap::handlers::execute))
        // Cached upstream quotes
        .route("/prices", get(handlers::get_prices))
        .layer(from_fn(require_user));

    // ==========================================================================
    // Admin Review Routes - guarded by the operator shared secret
    // ==========================================================================
    let admin_routes = Router::new()
        .route(
            "/review/deposits",
            get(crate::funding::handlers::review_deposit_queue),
        )
        .route(
            "/review/deposits/{id}",
            post(crate::funding::handlers::decide_deposit),
        )
        .route(
            "/review/withdrawals",
            get(crate::funding::handlers::review_withdrawal_queue),
        )
        .route(
            "/review/withdrawals/{id}",
            post(crate::funding::handlers::decide_withdrawal),
        )
        .layer(from_fn_with_state(state.clone(), admin_guard));

    // Build complete router
    let app = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // API Routes
        .nest("/api/v1", user_routes)
        .nest("/admin/v1", admin_routes);

    // [SECURITY] Mock API routes - only compiled when 'mock-api' feature is enabled.
    // Production builds MUST be compiled with `--no-default-features` to exclude this.
    #[cfg(feature = "mock-api")]
    let app = app.nest(
        "/internal/mock",
        Router::new().route("/credit", post(handlers::mock_credit)),
    );

    let app = app.with_state(state);

    // Bind address
    let addr = format!("{}:{}", config.host, config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("❌ FATAL: Failed to bind to {}: {}", addr, e);
            eprintln!(
                "   Hint: Port {} may already be in use. Check with: lsof -i :{}",
                config.port, config.port
            );
            std::process::exit(1);
        }
    };

    println!("🚀 Gateway listening on http://{}", addr);
    println!("📂 User API:  /api/v1/* (X-User-Id required)");
    println!("🔒 Admin API: /admin/v1/review/* (X-Admin-Secret required)");
    #[cfg(feature = "mock-api")]
    println!("🧪 Mock API:  /internal/mock/* (dev builds only)");

    // Start server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("❌ FATAL: Server error: {}", e);
        std::process::exit(1);
    }
}
