//! Complaint status machine: explicit states and legal transition guards.
//!
//! ```text
//! submitted → validated → ai_processed → assigned → in_progress → resolved
//!                                                               ↘ rejected
//! any non-terminal ──(sweeper, level 2)──→ escalated
//! escalated → assigned | in_progress | resolved | rejected
//! ```
//!
//! `resolved` and `rejected` are terminal: no status or escalation transition
//! leaves them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::ParseLabelError;

/// Lifecycle status of a complaint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Submitted,
    Validated,
    AiProcessed,
    Assigned,
    InProgress,
    Resolved,
    Rejected,
    Escalated,
}

/// Statuses that close a complaint.
pub const TERMINAL_STATUSES: &[ComplaintStatus] =
    &[ComplaintStatus::Resolved, ComplaintStatus::Rejected];

impl ComplaintStatus {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        TERMINAL_STATUSES.contains(&self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Validated => "validated",
            Self::AiProcessed => "ai_processed",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
            Self::Escalated => "escalated",
        }
    }

    /// Whether `self → to` is an edge of the status graph.
    pub fn can_transition_to(self, to: ComplaintStatus) -> bool {
        use ComplaintStatus::*;

        if self.is_terminal() || self == to {
            return false;
        }

        // Any open complaint can be escalated.
        if to == Escalated {
            return true;
        }

        matches!(
            (self, to),
            (Submitted, Validated)
                | (Validated, AiProcessed)
                | (AiProcessed, Assigned)
                | (Assigned, InProgress)
                | (InProgress, Resolved | Rejected)
                | (Escalated, Assigned | InProgress | Resolved | Rejected)
        )
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "validated" => Ok(Self::Validated),
            "ai_processed" => Ok(Self::AiProcessed),
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "rejected" => Ok(Self::Rejected),
            "escalated" => Ok(Self::Escalated),
            other => Err(ParseLabelError::new("complaint status", other)),
        }
    }
}

/// Error returned when an illegal status transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: ComplaintStatus,
    pub to: ComplaintStatus,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal status transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Check a transition, returning the typed error when it is not legal.
pub fn check_transition(
    from: ComplaintStatus,
    to: ComplaintStatus,
) -> Result<(), IllegalTransition> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}
