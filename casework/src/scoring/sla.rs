//! SLA policy: priority → fixed deadline offset.
//!
//! The deadline is computed once, at creation, and never recomputed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Priority;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaPolicy {
    pub critical_days: i64,
    pub medium_days: i64,
    pub low_days: i64,
    /// Used for priority labels that do not parse
    pub default_days: i64,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            critical_days: 3,
            medium_days: 7,
            low_days: 10,
            default_days: 10,
        }
    }
}

impl SlaPolicy {
    pub fn days_for(&self, priority: Priority) -> i64 {
        match priority {
            Priority::Critical => self.critical_days,
            Priority::Medium => self.medium_days,
            Priority::Low => self.low_days,
        }
    }

    /// Offset for a stored or external priority label.
    pub fn days_for_label(&self, label: &str) -> i64 {
        label
            .parse::<Priority>()
            .map(|p| self.days_for(p))
            .unwrap_or(self.default_days)
    }

    /// Deadline for a complaint of `priority` created at `created_at`, or
    /// `None` if it falls outside the representable range.
    pub fn deadline(&self, priority: Priority, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        shift_days(created_at, self.days_for(priority))
    }
}

/// `at` moved by `days` (negative moves back), `None` on overflow.
pub fn shift_days(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|d| at.checked_add_signed(d))
}
