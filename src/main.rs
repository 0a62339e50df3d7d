//! custodia - Custodial Balance Ledger Service
//!
//! This is the main entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌─────────────┐    ┌──────────┐    ┌─────────┐
//! │ Gateway  │───▶│ Funding FSM │───▶│ Holdings │───▶│  TxLog  │
//! │ (axum)   │    │ Swap Engine │    │  Ledger  │    │ (read)  │
//! └──────────┘    └─────────────┘    └──────────┘    └─────────┘
//!
//! Every balance mutation happens inside the holdings ledger under a
//! per-row lock; the transaction log and notification queue observe
//! outcomes but never drive them.
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;

use custodia::audit::AuditLog;
use custodia::funding::{DepositService, WithdrawService};
use custodia::gateway::{self, state::AppState};
use custodia::holdings::HoldingsLedger;
use custodia::notify::{LogSink, Notifier, NotifyService};
use custodia::prices::{HttpPriceSource, PriceCache, PriceSource, StaticPriceSource};
use custodia::swap::SwapEngine;
use custodia::txlog::TransactionLog;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

/// Static quotes served when `prices.mock_mode` is on. Values only need
/// to be plausible for local development.
const DEV_QUOTES: [(&str, i64); 6] = [
    ("BTC", 65_000),
    ("ETH", 3_200),
    ("SOL", 150),
    ("BNB", 580),
    ("USDT", 1),
    ("USDC", 1),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = custodia::config::AppConfig::load(&env);
    let _log_guard = custodia::logging::init_logging(&app_config);

    tracing::info!("Starting custodia in {} mode", env);

    // Holdings ledger, optionally with a CSV audit trail
    let ledger = if app_config.audit.enabled {
        let audit = AuditLog::open(&app_config.audit.path)
            .with_context(|| format!("Failed to open audit log at {}", app_config.audit.path))?;
        println!("[Audit] Recording balance mutations to {}", app_config.audit.path);
        Arc::new(HoldingsLedger::with_audit(Arc::new(audit)))
    } else {
        Arc::new(HoldingsLedger::new())
    };

    let txlog = Arc::new(TransactionLog::new());

    // Price source: live upstream, or static quotes for dev runs
    let source: Arc<dyn PriceSource> = if app_config.prices.mock_mode {
        println!("[Prices] Mock mode - serving static dev quotes");
        let source = StaticPriceSource::new();
        for (symbol, usd) in DEV_QUOTES {
            source.set_price(symbol, Decimal::from(usd));
        }
        Arc::new(source)
    } else {
        println!("[Prices] Upstream: {}", app_config.prices.base_url);
        Arc::new(HttpPriceSource::new(&app_config.prices)?)
    };
    let prices = Arc::new(PriceCache::new(
        source,
        Duration::from_secs(app_config.prices.ttl_secs),
    ));

    // Notification queue with a background drain task
    let notifier = Notifier::new(app_config.notify.queue_size);
    tokio::spawn(NotifyService::new(notifier.clone(), Arc::new(LogSink)).run());

    let deposits = Arc::new(DepositService::new(
        ledger.clone(),
        txlog.clone(),
        notifier.clone(),
    ));
    let withdrawals = Arc::new(WithdrawService::new(
        ledger.clone(),
        txlog.clone(),
        notifier.clone(),
    ));
    let swap = Arc::new(SwapEngine::new(
        ledger.clone(),
        prices.clone(),
        txlog.clone(),
        notifier.clone(),
        app_config.swap.fee_pct(),
    ));

    let state = AppState::new(
        ledger,
        deposits,
        withdrawals,
        swap,
        prices,
        txlog,
        notifier,
        app_config.admin.secret.clone(),
    );

    // Gateway config from YAML, allow --port override
    let mut gateway_config = app_config.gateway.clone();
    if let Some(port) = get_port_override() {
        gateway_config.port = port;
    }

    gateway::run_server(&gateway_config, state).await;

    Ok(())
}
