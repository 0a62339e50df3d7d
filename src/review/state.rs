//! Review FSM State Definitions
//!
//! State IDs are SMALLINT-shaped for row storage and export.
//! Terminal states: APPROVED (20), REJECTED (-10).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Review FSM States
///
/// Negative IDs mark the failure side, mirroring how the row store
/// encodes terminal rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum ReviewState {
    /// Submitted - waiting for an administrator to pick it up
    Pending = 0,

    /// Claimed by an administrator - no funds move in this state
    UnderReview = 10,

    /// Terminal: request granted, funds moved
    Approved = 20,

    /// Terminal: request denied
    Rejected = -10,
}

impl ReviewState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewState::Approved | ReviewState::Rejected)
    }

    /// The single transition table shared by every reviewed resource kind.
    ///
    /// `PENDING -> REJECTED` is the fast-reject path; `PENDING -> APPROVED`
    /// is deliberately NOT allowed (every approval passes through
    /// UNDER_REVIEW first).
    #[inline]
    pub fn can_transition_to(&self, target: ReviewState) -> bool {
        use ReviewState::*;
        matches!(
            (*self, target),
            (Pending, UnderReview) | (Pending, Rejected) | (UnderReview, Approved) | (UnderReview, Rejected)
        )
    }

    /// Get the numeric state ID for row storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from a stored state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(ReviewState::Pending),
            10 => Some(ReviewState::UnderReview),
            20 => Some(ReviewState::Approved),
            -10 => Some(ReviewState::Rejected),
            _ => None,
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Pending => "PENDING",
            ReviewState::UnderReview => "UNDER_REVIEW",
            ReviewState::Approved => "APPROVED",
            ReviewState::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for ReviewState {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        ReviewState::from_id(value).ok_or(())
    }
}

impl std::str::FromStr for ReviewState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReviewState::Pending),
            "UNDER_REVIEW" => Ok(ReviewState::UnderReview),
            "APPROVED" => Ok(ReviewState::Approved),
            "REJECTED" => Ok(ReviewState::Rejected),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ReviewState::Approved.is_terminal());
        assert!(ReviewState::Rejected.is_terminal());

        assert!(!ReviewState::Pending.is_terminal());
        assert!(!ReviewState::UnderReview.is_terminal());
    }

    #[test]
    fn test_transition_table() {
        use ReviewState::*;

        assert!(Pending.can_transition_to(UnderReview));
        assert!(Pending.can_transition_to(Rejected)); // Fast reject
        assert!(UnderReview.can_transition_to(Approved));
        assert!(UnderReview.can_transition_to(Rejected));

        // Approval requires claiming first
        assert!(!Pending.can_transition_to(Approved));

        // Terminal states accept nothing, including self-transitions
        for target in [Pending, UnderReview, Approved, Rejected] {
            assert!(!Approved.can_transition_to(target));
            assert!(!Rejected.can_transition_to(target));
        }

        // No state transitions to itself or backwards
        assert!(!Pending.can_transition_to(Pending));
        assert!(!UnderReview.can_transition_to(Pending));
        assert!(!UnderReview.can_transition_to(UnderReview));
    }

    #[test]
    fn test_state_id_roundtrip() {
        let states = [
            ReviewState::Pending,
            ReviewState::UnderReview,
            ReviewState::Approved,
            ReviewState::Rejected,
        ];

        for state in states {
            let id = state.id();
            let recovered = ReviewState::from_id(id).unwrap();
            assert_eq!(state, recovered);
        }
    }

    #[test]
    fn test_invalid_state_id() {
        assert!(ReviewState::from_id(999).is_none());
        assert!(ReviewState::from_id(-999).is_none());
        assert!(ReviewState::try_from(5).is_err());
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(ReviewState::Pending.to_string(), "PENDING");
        assert_eq!(ReviewState::UnderReview.to_string(), "UNDER_REVIEW");

        let json = serde_json::to_string(&ReviewState::UnderReview).unwrap();
        assert_eq!(json, "\"UNDER_REVIEW\"");
        let back: ReviewState = serde_json::from_str("\"REJECTED\"").unwrap();
        assert_eq!(back, ReviewState::Rejected);
    }

    #[test]
    fn test_parse_from_str() {
        assert_eq!("APPROVED".parse::<ReviewState>(), Ok(ReviewState::Approved));
        assert_eq!(
            "UNDER_REVIEW".parse::<ReviewState>(),
            Ok(ReviewState::UnderReview)
        );
        assert!("approved".parse::<ReviewState>().is_err());
        assert!("".parse::<ReviewState>().is_err());
    }
}
