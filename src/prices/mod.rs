//! Market price plumbing.
//!
//! A [`PriceSource`] quotes symbols in USD; the [`PriceCache`] sits in
//! front of it with a TTL and stale-fallback so swap quoting keeps
//! working through short upstream outages.

pub mod cache;
pub mod source;

// Re-exports for convenience
pub use cache::{Clock, ManualClock, PriceCache, SystemClock};
pub use source::{HttpPriceSource, PricePoint, PriceSource, PriceSourceError, StaticPriceSource};
