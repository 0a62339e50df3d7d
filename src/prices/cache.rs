//! TTL cache in front of a [`PriceSource`].
//!
//! Consumers never see upstream failures: a miss that cannot be
//! refreshed falls back to the last snapshot for the same symbol set,
//! or to an empty map when none exists. Time is injected through the
//! [`Clock`] trait so expiry is testable without sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use super::source::{PricePoint, PriceSource};
use crate::core_types::Symbol;

/// Monotonic time provider.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock for production wiring.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-cranked clock. Only moves when advanced.
pub struct ManualClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, delta: Duration) {
        self.offset_ms
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

struct CacheSlot {
    fetched_at: Instant,
    prices: FxHashMap<Symbol, PricePoint>,
}

/// One slot per requested symbol set, keyed by the normalized set.
pub struct PriceCache {
    source: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    slots: DashMap<String, CacheSlot>,
}

/// Uppercase, sort and dedup a symbol list; the joined form is the
/// cache key, so `[eth, btc]` and `[BTC, ETH]` share a slot.
fn normalize(symbols: &[Symbol]) -> (String, Vec<Symbol>) {
    let mut normalized: Vec<Symbol> = symbols.iter().map(|s| s.to_uppercase()).collect();
    normalized.sort();
    normalized.dedup();
    (normalized.join(","), normalized)
}

impl PriceCache {
    pub fn new(source: Arc<dyn PriceSource>, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn PriceSource>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            ttl,
            slots: DashMap::new(),
        }
    }

    /// Quotes for a symbol set. Fresh slots are served as-is; expired or
    /// missing slots trigger one upstream fetch. Never fails: on fetch
    /// failure the previous snapshot is served, or an empty map when the
    /// slot was never filled.
    pub async fn get_prices(&self, symbols: &[Symbol]) -> FxHashMap<Symbol, PricePoint> {
        let (key, normalized) = normalize(symbols);
        if normalized.is_empty() {
            return FxHashMap::default();
        }

        let now = self.clock.now();
        if let Some(slot) = self.slots.get(&key) {
            if now.duration_since(slot.fetched_at) < self.ttl {
                return slot.prices.clone();
            }
        }
        // Slot guard dropped above; never hold it across the fetch.

        match self.source.fetch(&normalized).await {
            Ok(prices) => {
                debug!("Refreshed price slot {} ({} quotes)", key, prices.len());
                self.slots.insert(
                    key,
                    CacheSlot {
                        fetched_at: now,
                        prices: prices.clone(),
                    },
                );
                prices
            }
            Err(e) => {
                warn!("Price fetch for {} failed: {}", key, e);
                match self.slots.get(&key) {
                    Some(stale) => {
                        debug!("Serving stale prices for {}", key);
                        stale.prices.clone()
                    }
                    None => FxHashMap::default(),
                }
            }
        }
    }

    /// Drop the slot for one symbol set.
    pub fn invalidate(&self, symbols: &[Symbol]) {
        let (key, _) = normalize(symbols);
        self.slots.remove(&key);
    }

    pub fn invalidate_all(&self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::source::StaticPriceSource;
    use rust_decimal_macros::dec;

    const TTL: Duration = Duration::from_secs(60);

    fn symbols(list: &[&str]) -> Vec<Symbol> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (Arc<StaticPriceSource>, Arc<ManualClock>, PriceCache) {
        let source = Arc::new(StaticPriceSource::new());
        source.set_price("BTC", dec!(64000));
        source.set_price("ETH", dec!(2000));
        let clock = Arc::new(ManualClock::new());
        let cache = PriceCache::with_clock(source.clone(), TTL, clock.clone());
        (source, clock, cache)
    }

    #[tokio::test]
    async fn test_fresh_slot_served_without_upstream_call() {
        let (source, _clock, cache) = setup();

        let first = cache.get_prices(&symbols(&["BTC", "ETH"])).await;
        assert_eq!(first["BTC"].price_usd, dec!(64000));
        assert_eq!(source.fetch_calls(), 1);

        // Same set, different order and case: one slot, no refetch
        let second = cache.get_prices(&symbols(&["eth", "btc"])).await;
        assert_eq!(second.len(), 2);
        assert_eq!(source.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_slot_triggers_refetch() {
        let (source, clock, cache) = setup();

        cache.get_prices(&symbols(&["BTC"])).await;
        assert_eq!(source.fetch_calls(), 1);

        clock.advance(Duration::from_secs(59));
        cache.get_prices(&symbols(&["BTC"])).await;
        assert_eq!(source.fetch_calls(), 1);

        clock.advance(Duration::from_secs(2));
        source.set_price("BTC", dec!(65000));
        let refreshed = cache.get_prices(&symbols(&["BTC"])).await;
        assert_eq!(source.fetch_calls(), 2);
        assert_eq!(refreshed["BTC"].price_usd, dec!(65000));
    }

    #[tokio::test]
    async fn test_stale_fallback_on_upstream_failure() {
        let (source, clock, cache) = setup();

        let first = cache.get_prices(&symbols(&["BTC"])).await;
        assert_eq!(first["BTC"].price_usd, dec!(64000));

        source.set_failing(true);
        clock.advance(Duration::from_secs(61));

        let stale = cache.get_prices(&symbols(&["BTC"])).await;
        assert_eq!(source.fetch_calls(), 2);
        assert_eq!(stale["BTC"].price_usd, dec!(64000));
    }

    #[tokio::test]
    async fn test_cold_failure_returns_empty_map() {
        let (source, _clock, cache) = setup();
        source.set_failing(true);

        let prices = cache.get_prices(&symbols(&["BTC"])).await;
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_symbol_sets_use_distinct_slots() {
        let (source, _clock, cache) = setup();

        cache.get_prices(&symbols(&["BTC"])).await;
        cache.get_prices(&symbols(&["BTC", "ETH"])).await;
        assert_eq!(source.fetch_calls(), 2);

        cache.get_prices(&symbols(&["BTC"])).await;
        assert_eq!(source.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (source, _clock, cache) = setup();

        cache.get_prices(&symbols(&["BTC"])).await;
        cache.invalidate(&symbols(&["BTC"]));
        cache.get_prices(&symbols(&["BTC"])).await;
        assert_eq!(source.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_request_short_circuits() {
        let (source, _clock, cache) = setup();
        let prices = cache.get_prices(&[]).await;
        assert!(prices.is_empty());
        assert_eq!(source.fetch_calls(), 0);
    }
}
