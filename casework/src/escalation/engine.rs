//! Escalation Engine: deterministic tier decisions for one complaint
//!
//! Pure: given a complaint and the current time, decide the next tier
//! transition, if any. The sweeper applies the decision.
//!
//! ```text
//! none    ──(deadline within warning window)──▶ level_1   notify assignee
//! none/L1 ──(now ≥ deadline)──────────────────▶ level_2   status → escalated, notify supervisor
//! level_2 ──(now ≥ deadline + grace)──────────▶ level_3   notify admin
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::shift_days;
use crate::types::{Complaint, EscalationTier, Role};

/// Configuration for the Escalation Engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Level 1 fires while at most this many whole days remain before the
    /// deadline. Partial days are dropped, so the default of 1 opens the
    /// window just under 48 hours out (47h59m qualifies, 48h does not).
    pub warning_days: i64,
    /// Level 3 fires this many days after the deadline
    pub admin_grace_days: i64,
    /// Compare-and-set conflicts tolerated per complaint per sweep
    pub cas_retries: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            warning_days: 1,
            admin_grace_days: 2,
            cas_retries: 3,
        }
    }
}

/// One tier transition decided by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStep {
    pub from: Option<EscalationTier>,
    pub to: EscalationTier,
    pub reason: String,
    /// Role to route to; `None` means notify the current assignee
    pub route_to: Option<Role>,
    /// Whether the transition moves the status to `escalated`
    pub marks_escalated: bool,
}

fn format_deadline(deadline: DateTime<Utc>) -> String {
    deadline.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// The Escalation Engine
#[derive(Debug, Clone, Default)]
pub struct EscalationEngine {
    config: EscalationConfig,
}

impl EscalationEngine {
    /// Create a new engine with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: EscalationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    /// Next tier transition for `complaint` at `now`, or `None` if its tier
    /// already reflects the elapsed time.
    pub fn decide(&self, complaint: &Complaint, now: DateTime<Utc>) -> Option<EscalationStep> {
        if complaint.is_terminal() {
            return None;
        }

        let deadline = complaint.sla_deadline;
        let tier = complaint.escalation_tier;

        match tier {
            Some(EscalationTier::Level3) => None,

            Some(EscalationTier::Level2) => {
                // A grace period past the end of the calendar never elapses.
                let due = shift_days(deadline, self.config.admin_grace_days);
                if due.is_some_and(|due| now >= due) {
                    Some(EscalationStep {
                        from: tier,
                        to: EscalationTier::Level3,
                        reason: format!(
                            "Critical SLA breach: {} days overdue",
                            (now - deadline).num_days()
                        ),
                        route_to: Some(Role::Admin),
                        marks_escalated: false,
                    })
                } else {
                    None
                }
            }

            None | Some(EscalationTier::Level1) if now >= deadline => Some(EscalationStep {
                from: tier,
                to: EscalationTier::Level2,
                reason: format!("SLA deadline exceeded: {}", format_deadline(deadline)),
                route_to: Some(Role::Supervisor),
                marks_escalated: true,
            }),

            None if (deadline - now).num_days() <= self.config.warning_days => {
                Some(EscalationStep {
                    from: None,
                    to: EscalationTier::Level1,
                    reason: format!("SLA deadline approaching: {}", format_deadline(deadline)),
                    route_to: None,
                    marks_escalated: false,
                })
            }

            None | Some(EscalationTier::Level1) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ComplaintStatus;
    use crate::types::{Classification, Priority, WaterBodyKind};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn complaint(deadline: DateTime<Utc>, tier: Option<EscalationTier>) -> Complaint {
        Complaint {
            id: Uuid::new_v4(),
            case_number: "AQS-20240601-00001".into(),
            reporter_id: Uuid::new_v4(),
            water_body_id: None,
            category: WaterBodyKind::River,
            description: None,
            address: None,
            latitude: 0.0,
            longitude: 0.0,
            classification: Classification::unknown(),
            severity_score: 45,
            priority: Priority::Medium,
            status: ComplaintStatus::Assigned,
            assigned_to: None,
            sla_deadline: deadline,
            resolved_at: None,
            resolution_notes: None,
            escalation_tier: tier,
            escalated_at: None,
            created_at: deadline - Duration::days(7),
            updated_at: deadline - Duration::days(7),
        }
    }

    #[test]
    fn test_warning_at_25_hours() {
        let engine = EscalationEngine::new();
        let step = engine
            .decide(&complaint(now() + Duration::hours(25), None), now())
            .unwrap();
        assert_eq!(step.to, EscalationTier::Level1);
        assert!(!step.marks_escalated);
        assert!(step.reason.starts_with("SLA deadline approaching"));
    }

    #[test]
    fn test_warning_window_counts_whole_days() {
        let engine = EscalationEngine::new();
        let step = engine
            .decide(&complaint(now() + Duration::hours(47), None), now())
            .unwrap();
        assert_eq!(step.to, EscalationTier::Level1);
    }

    #[test]
    fn test_no_warning_two_days_out() {
        let engine = EscalationEngine::new();
        assert!(engine
            .decide(&complaint(now() + Duration::hours(48), None), now())
            .is_none());
    }

    #[test]
    fn test_level_one_waits_for_deadline() {
        let engine = EscalationEngine::new();
        let c = complaint(now() + Duration::hours(3), Some(EscalationTier::Level1));
        assert!(engine.decide(&c, now()).is_none());
    }

    #[test]
    fn test_deadline_reached_goes_to_level_two() {
        let engine = EscalationEngine::new();
        for tier in [None, Some(EscalationTier::Level1)] {
            let step = engine.decide(&complaint(now(), tier), now()).unwrap();
            assert_eq!(step.from, tier);
            assert_eq!(step.to, EscalationTier::Level2);
            assert_eq!(step.route_to, Some(Role::Supervisor));
            assert!(step.marks_escalated);
        }
    }

    #[test]
    fn test_level_three_after_grace() {
        let engine = EscalationEngine::new();
        let c = complaint(now() - Duration::days(3), Some(EscalationTier::Level2));
        let step = engine.decide(&c, now()).unwrap();
        assert_eq!(step.to, EscalationTier::Level3);
        assert_eq!(step.route_to, Some(Role::Admin));
        assert_eq!(step.reason, "Critical SLA breach: 3 days overdue");

        let c = complaint(now() - Duration::hours(47), Some(EscalationTier::Level2));
        assert!(engine.decide(&c, now()).is_none());
    }

    #[test]
    fn test_top_tier_and_terminal_are_final() {
        let engine = EscalationEngine::new();
        let c = complaint(now() - Duration::days(30), Some(EscalationTier::Level3));
        assert!(engine.decide(&c, now()).is_none());

        let mut closed = complaint(now() - Duration::days(30), None);
        closed.status = ComplaintStatus::Resolved;
        assert!(engine.decide(&closed, now()).is_none());
    }

    #[test]
    fn test_custom_grace() {
        let engine = EscalationEngine::with_config(EscalationConfig {
            admin_grace_days: 5,
            ..Default::default()
        });
        let c = complaint(now() - Duration::days(3), Some(EscalationTier::Level2));
        assert!(engine.decide(&c, now()).is_none());
    }

    #[test]
    fn test_unreachable_grace_never_fires() {
        let engine = EscalationEngine::with_config(EscalationConfig {
            admin_grace_days: 1_000_000_000,
            ..Default::default()
        });
        let c = complaint(now() - Duration::days(3), Some(EscalationTier::Level2));
        assert!(engine.decide(&c, now()).is_none());
    }
}
