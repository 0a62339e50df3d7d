//! Gateway types module
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//!
//! ## Submodules
//! - [`response`]: Response types and error codes

pub mod response;

// Re-export commonly used types at module root
pub use response::{ApiResponse, error_codes};
