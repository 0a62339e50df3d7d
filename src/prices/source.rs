//! Upstream price feeds.
//!
//! [`HttpPriceSource`] talks to a CoinGecko-compatible `/simple/price`
//! endpoint. [`StaticPriceSource`] is an in-memory source for tests and
//! mock deployments.

use std::str::FromStr;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PricesConfig;
use crate::core_types::Symbol;

/// Built-in symbol -> upstream id table. Config entries override these.
static DEFAULT_SYMBOL_IDS: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("USDT", "tether"),
        ("USDC", "usd-coin"),
        ("SOL", "solana"),
        ("BNB", "binancecoin"),
        ("XRP", "ripple"),
        ("ADA", "cardano"),
        ("DOGE", "dogecoin"),
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Malformed upstream payload: {0}")]
    Parse(String),
}

/// USD quote for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    pub price_usd: Decimal,
    pub change_24h: Decimal,
}

/// A feed that can quote a batch of symbols in USD.
///
/// Implementations return what they know: symbols the feed cannot quote
/// are simply absent from the result, never an error.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(
        &self,
        symbols: &[Symbol],
    ) -> Result<FxHashMap<Symbol, PricePoint>, PriceSourceError>;
}

/// `/simple/price` response entry.
#[derive(Deserialize)]
struct UpstreamQuote {
    usd: Option<serde_json::Number>,
    usd_24h_change: Option<serde_json::Number>,
}

/// HTTP source speaking the CoinGecko simple-price wire format.
pub struct HttpPriceSource {
    base_url: String,
    client: reqwest::Client,
    /// Symbol -> upstream id (e.g. BTC -> bitcoin)
    symbol_ids: FxHashMap<Symbol, String>,
}

impl HttpPriceSource {
    pub fn new(config: &PricesConfig) -> Result<Self, PriceSourceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PriceSourceError::Upstream(format!("Failed to create HTTP client: {}", e))
            })?;

        let mut symbol_ids: FxHashMap<Symbol, String> = DEFAULT_SYMBOL_IDS
            .iter()
            .map(|(sym, id)| (sym.to_string(), id.to_string()))
            .collect();
        for (sym, id) in &config.symbol_ids {
            symbol_ids.insert(sym.to_uppercase(), id.clone());
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            symbol_ids,
        })
    }

    pub fn known_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.symbol_ids.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

/// Parse a JSON number through its literal form.
/// `64000.1` must survive exactly, so no f64 round trip.
fn number_to_decimal(n: &serde_json::Number) -> Result<Decimal, PriceSourceError> {
    Decimal::from_str(&n.to_string())
        .or_else(|_| Decimal::from_scientific(&n.to_string()))
        .map_err(|e| PriceSourceError::Parse(format!("Bad numeric quote {}: {}", n, e)))
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch(
        &self,
        symbols: &[Symbol],
    ) -> Result<FxHashMap<Symbol, PricePoint>, PriceSourceError> {
        // Map requested symbols to upstream ids; unknown symbols are
        // dropped here and surface as PriceUnavailable at the consumer.
        let mut id_to_symbol: FxHashMap<&str, &str> = FxHashMap::default();
        for symbol in symbols {
            match self.symbol_ids.get(symbol) {
                Some(id) => {
                    id_to_symbol.insert(id.as_str(), symbol.as_str());
                }
                None => {
                    debug!("No upstream id for symbol {}, skipping", symbol);
                }
            }
        }
        if id_to_symbol.is_empty() {
            return Ok(FxHashMap::default());
        }

        let mut ids: Vec<&str> = id_to_symbol.keys().copied().collect();
        ids.sort_unstable();
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.base_url,
            ids.join(",")
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceSourceError::Upstream(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PriceSourceError::Upstream(format!(
                "Upstream returned status {}",
                response.status()
            )));
        }

        let payload: FxHashMap<String, UpstreamQuote> = response
            .json()
            .await
            .map_err(|e| PriceSourceError::Parse(format!("Failed to parse response: {}", e)))?;

        let mut prices = FxHashMap::default();
        for (id, quote) in &payload {
            let Some(symbol) = id_to_symbol.get(id.as_str()) else {
                continue;
            };
            let Some(usd) = &quote.usd else {
                warn!("Upstream quoted {} without a usd price", id);
                continue;
            };
            let change_24h = match &quote.usd_24h_change {
                Some(n) => number_to_decimal(n)?,
                None => Decimal::ZERO,
            };
            prices.insert(
                symbol.to_string(),
                PricePoint {
                    price_usd: number_to_decimal(usd)?,
                    change_24h,
                },
            );
        }

        Ok(prices)
    }
}

/// In-memory source with settable quotes and a failure switch.
pub struct StaticPriceSource {
    prices: RwLock<FxHashMap<Symbol, PricePoint>>,
    failing: AtomicBool,
    fetch_calls: AtomicU32,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(FxHashMap::default()),
            failing: AtomicBool::new(false),
            fetch_calls: AtomicU32::new(0),
        }
    }

    pub fn set_price(&self, symbol: &str, price_usd: Decimal) {
        self.set_point(
            symbol,
            PricePoint {
                price_usd,
                change_24h: Decimal::ZERO,
            },
        );
    }

    pub fn set_point(&self, symbol: &str, point: PricePoint) {
        let mut prices = match self.prices.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        prices.insert(symbol.to_uppercase(), point);
    }

    /// Make every subsequent fetch fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetch attempts, including failed ones.
    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl Default for StaticPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch(
        &self,
        symbols: &[Symbol],
    ) -> Result<FxHashMap<Symbol, PricePoint>, PriceSourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PriceSourceError::Upstream(
                "Static source switched to failing".to_string(),
            ));
        }

        let prices = match self.prices.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(symbols
            .iter()
            .filter_map(|sym| prices.get(sym).map(|p| (sym.clone(), *p)))
            .collect())
    }
}
