//! Review Workflow Module
//!
//! One finite-state machine for every administrator-gated resource kind.
//! Deposits and withdrawals both move through the same four states with
//! the same transition table; what differs per kind is the side effect
//! bound to each terminal decision, supplied as a [`ReviewEffect`] hook.
//!
//! Transition table:
//!
//! ```text
//! PENDING      -> UNDER_REVIEW | REJECTED
//! UNDER_REVIEW -> APPROVED | REJECTED
//! APPROVED     -> (terminal)
//! REJECTED     -> (terminal)
//! ```

pub mod state;
pub mod workflow;

// Re-exports for convenience
pub use state::ReviewState;
pub use workflow::{NoEffect, ReviewEffect, ReviewError, ReviewRegistry, Reviewed};
