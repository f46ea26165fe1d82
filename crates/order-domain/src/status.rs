//! Order status enum and the shared sequencing predicate.
//!
//! Producer and consumer both link against this module so the two sides can
//! never drift on what counts as a valid transition.

use serde::{Deserialize, Serialize};

/// Order status. Closed five-value enum with a fixed numeric rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Just created, not yet confirmed.
    New,
    /// Confirmed by the merchant/payment flow.
    Confirmed,
    /// Handed off to a carrier.
    Dispatched,
    /// Delivered and closed out. Terminal.
    Completed,
    /// Canceled from any non-terminal state. Terminal.
    Canceled,
}

impl Status {
    /// All known statuses, in rank order.
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::Confirmed,
        Self::Dispatched,
        Self::Completed,
        Self::Canceled,
    ];

    /// Numeric rank used by the sequencing predicate.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::New => 0,
            Self::Confirmed => 1,
            Self::Dispatched => 2,
            Self::Completed => 3,
            Self::Canceled => 4,
        }
    }

    /// Whether no further transitions are accepted from this status (I5).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.rank() >= 3
    }

    /// Parse a status from a case-insensitive string.
    ///
    /// Both `"CANCELED"` and `"CANCELLED"` map to [`Status::Canceled`] (spec §3).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "NEW" => Some(Self::New),
            "CONFIRMED" => Some(Self::Confirmed),
            "DISPATCHED" => Some(Self::Dispatched),
            "COMPLETED" => Some(Self::Completed),
            "CANCELED" | "CANCELLED" => Some(Self::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Dispatched => write!(f, "DISPATCHED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// Error returned by [`StatusMachine::validate_transition`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid transition from {from} to {to}: {reason}")]
pub struct TransitionError {
    /// Prior status, if any.
    pub from: DisplayOpt,
    /// Attempted next status.
    pub to: Status,
    /// Human-readable reason.
    pub reason: String,
}

/// Small `Display` wrapper so `TransitionError` can print `Option<Status>` as "none" or the status.
#[derive(Debug, Clone, Copy)]
pub struct DisplayOpt(pub Option<Status>);

impl std::fmt::Display for DisplayOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(status) => write!(f, "{status}"),
            None => write!(f, "none"),
        }
    }
}

/// Pure function deciding whether a status transition is valid (C1).
///
/// Implements the spec §4.1 contract in full:
///
/// - `current = None` (first write): any of the five known statuses is valid.
/// - `current == next`: invalid (duplicate/no-op, caller must not write).
/// - `next == CANCELED` and `current` non-terminal (rank 0..2): valid.
///   `COMPLETED → CANCELED` is invalid.
/// - Otherwise: valid iff `rank(next) == rank(current) + 1`.
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(current: Option<Status>, next: Status) -> bool {
        let Some(current) = current else {
            return true;
        };

        if current == next {
            return false;
        }

        if next == Status::Canceled {
            return current.rank() <= 2;
        }

        next.rank() == current.rank() + 1
    }

    /// Validate a status transition, returning a descriptive error on failure.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the transition is invalid.
    pub fn validate_transition(current: Option<Status>, next: Status) -> Result<(), TransitionError> {
        if Self::is_valid_transition(current, next) {
            return Ok(());
        }

        let reason = match current {
            Some(c) if c == next => format!("{next} is already the current status"),
            Some(c) if c.is_terminal() => format!("{c} is terminal, cannot transition to {next}"),
            Some(c) => format!("{next} does not follow {c} (no skipping, no backward moves)"),
            None => format!("{next} is not a known status"),
        };

        Err(TransitionError {
            from: DisplayOpt(current),
            to: next,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_accepts_any_status() {
        for status in Status::ALL {
            assert!(StatusMachine::is_valid_transition(None, status));
        }
    }

    #[test]
    fn equal_status_is_rejected() {
        for status in Status::ALL {
            assert!(!StatusMachine::is_valid_transition(Some(status), status));
        }
    }

    #[test]
    fn sequential_progression_is_accepted() {
        assert!(StatusMachine::is_valid_transition(
            Some(Status::New),
            Status::Confirmed
        ));
        assert!(StatusMachine::is_valid_transition(
            Some(Status::Confirmed),
            Status::Dispatched
        ));
        assert!(StatusMachine::is_valid_transition(
            Some(Status::Dispatched),
            Status::Completed
        ));
    }

    #[test]
    fn skipping_is_rejected() {
        assert!(!StatusMachine::is_valid_transition(
            Some(Status::New),
            Status::Dispatched
        ));
        assert!(!StatusMachine::is_valid_transition(
            Some(Status::New),
            Status::Completed
        ));
    }

    #[test]
    fn cancel_from_non_terminal_is_accepted() {
        assert!(StatusMachine::is_valid_transition(
            Some(Status::New),
            Status::Canceled
        ));
        assert!(StatusMachine::is_valid_transition(
            Some(Status::Confirmed),
            Status::Canceled
        ));
        assert!(StatusMachine::is_valid_transition(
            Some(Status::Dispatched),
            Status::Canceled
        ));
    }

    #[test]
    fn completed_to_canceled_is_rejected() {
        assert!(!StatusMachine::is_valid_transition(
            Some(Status::Completed),
            Status::Canceled
        ));
    }

    #[test]
    fn no_transitions_from_terminal_states() {
        for terminal in [Status::Completed, Status::Canceled] {
            for next in Status::ALL {
                if terminal == next {
                    continue;
                }
                assert!(!StatusMachine::is_valid_transition(Some(terminal), next));
            }
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_normalizes_cancelled() {
        assert_eq!(Status::parse("new"), Some(Status::New));
        assert_eq!(Status::parse("CONFIRMED"), Some(Status::Confirmed));
        assert_eq!(Status::parse("canceled"), Some(Status::Canceled));
        assert_eq!(Status::parse("CANCELLED"), Some(Status::Canceled));
        assert_eq!(Status::parse("cancelled"), Some(Status::Canceled));
        assert_eq!(Status::parse("bogus"), None);
    }

    #[test]
    fn validate_transition_error_describes_terminal_reason() {
        let err =
            StatusMachine::validate_transition(Some(Status::Completed), Status::Canceled).unwrap_err();
        assert!(err.reason.contains("terminal"));
    }

    #[test]
    fn rank_is_monotonic_with_declaration_order() {
        let ranks: Vec<u8> = Status::ALL.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }
}
