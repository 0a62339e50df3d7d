//! USD-priced asset conversion.

pub mod engine;
pub mod handlers;
pub mod types;

// Re-exports for convenience
pub use engine::{SwapEngine, SwapError};
pub use types::{SwapQuote, SwapReceipt};
