//! Cross-cutting HTTP handlers for the gateway
//!
//! Domain-specific handlers live with their modules
//! (`crate::funding::handlers`, `crate::swap::handlers`); this module
//! holds the ones that do not belong to a single domain.

pub mod account;
pub mod health;
#[cfg(feature = "mock-api")]
pub mod mock;
pub mod prices;

// Re-exports for convenience
pub use account::{get_balances, get_history};
pub use health::health_check;
#[cfg(feature = "mock-api")]
pub use mock::mock_credit;
pub use prices::get_prices;
