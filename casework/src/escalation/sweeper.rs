//! Escalation sweeper: one idempotent pass over every open complaint
//!
//! Complaints are visited in ascending deadline order. For each one the
//! engine's decision is applied through the store's compare-and-set, and
//! re-evaluated until the tier reflects the elapsed time, so a complaint that
//! went unswept for days reaches its correct tier in a single pass. A lost
//! compare-and-set re-reads the complaint and decides again. Failures are
//! recorded per complaint and never stop the pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::engine::{EscalationEngine, EscalationStep};
use crate::external::Directory;
use crate::notify::{Message, Notifier};
use crate::store::{EscalationAdvance, SharedRepository, StoreError, StoreResult};
use crate::types::{Complaint, ComplaintId, EscalationRecord, EscalationTier, User, UserId};

/// One tier transition applied during a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationAction {
    pub complaint_id: ComplaintId,
    pub case_number: String,
    pub from_tier: Option<EscalationTier>,
    pub tier: EscalationTier,
    pub reason: String,
    /// Staff member the escalation was routed to, if one was found
    pub target: Option<UserId>,
    /// Whether the routed notification was delivered
    pub notified: bool,
}

/// A complaint the sweep could not finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub complaint_id: ComplaintId,
    pub case_number: String,
    pub error: String,
}

/// Per-invocation report for operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub swept_at: DateTime<Utc>,
    pub evaluated: usize,
    pub actions: Vec<EscalationAction>,
    pub failures: Vec<SweepFailure>,
}

impl SweepSummary {
    fn new(swept_at: DateTime<Utc>) -> Self {
        Self {
            swept_at,
            evaluated: 0,
            actions: Vec::new(),
            failures: Vec::new(),
        }
    }
}

pub struct EscalationSweeper {
    repo: SharedRepository,
    directory: Arc<dyn Directory>,
    notifier: Notifier,
    engine: EscalationEngine,
}

impl EscalationSweeper {
    pub fn new(
        repo: SharedRepository,
        directory: Arc<dyn Directory>,
        notifier: Notifier,
        engine: EscalationEngine,
    ) -> Self {
        Self {
            repo,
            directory,
            notifier,
            engine,
        }
    }

    /// Run one pass at the current time.
    pub async fn run_once(&self) -> StoreResult<SweepSummary> {
        self.run_once_at(Utc::now()).await
    }

    /// Run one pass as of `now`.
    ///
    /// Only failing to list open complaints is an error; everything after
    /// that is isolated per complaint and reported in the summary.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> StoreResult<SweepSummary> {
        let open = self.repo.open_complaints().await?;
        let mut summary = SweepSummary::new(now);
        summary.evaluated = open.len();

        for complaint in open {
            let id = complaint.id;
            let case_number = complaint.case_number.clone();
            if let Err(e) = self.sweep_complaint(complaint, now, &mut summary).await {
                warn!(case = %case_number, error = %e, "Escalation failed for complaint");
                summary.failures.push(SweepFailure {
                    complaint_id: id,
                    case_number,
                    error: e.to_string(),
                });
            }
        }

        info!(
            evaluated = summary.evaluated,
            actions = summary.actions.len(),
            failures = summary.failures.len(),
            "Escalation sweep complete"
        );
        Ok(summary)
    }

    async fn sweep_complaint(
        &self,
        mut complaint: Complaint,
        now: DateTime<Utc>,
        summary: &mut SweepSummary,
    ) -> StoreResult<()> {
        let mut conflicts = 0;

        while let Some(step) = self.engine.decide(&complaint, now) {
            let recipient = self.recipient_for(&complaint, &step).await;
            let advance = EscalationAdvance {
                expected: complaint.escalation_tier,
                record: EscalationRecord {
                    id: Uuid::new_v4(),
                    complaint_id: complaint.id,
                    from_tier: step.from,
                    to_tier: step.to,
                    from_officer: complaint.assigned_to,
                    to_officer: recipient.as_ref().map(|u| u.id),
                    reason: step.reason.clone(),
                    at: now,
                },
                mark_escalated: step.marks_escalated,
            };

            match self.repo.advance_escalation(complaint.id, &advance).await {
                Ok(updated) => {
                    info!(
                        case = %updated.case_number,
                        from = ?step.from,
                        to = %step.to,
                        target = ?advance.record.to_officer,
                        "Complaint escalated"
                    );
                    let notified = match &recipient {
                        Some(user) => {
                            let message = Message::escalation(&updated.case_number, step.to);
                            self.notifier.send(user, Some(&updated), &message, now).await
                        }
                        None => false,
                    };
                    summary.actions.push(EscalationAction {
                        complaint_id: updated.id,
                        case_number: updated.case_number.clone(),
                        from_tier: step.from,
                        tier: step.to,
                        reason: step.reason,
                        target: advance.record.to_officer,
                        notified,
                    });
                    complaint = updated;
                }
                Err(e) if e.is_conflict() => {
                    conflicts += 1;
                    debug!(case = %complaint.case_number, conflicts, "Escalation write conflict");
                    if conflicts > self.engine.config().cas_retries {
                        return Err(e);
                    }
                    complaint = match self.repo.get_complaint(complaint.id).await? {
                        Some(fresh) => fresh,
                        None => {
                            return Err(StoreError::NotFound(format!(
                                "complaint {}",
                                complaint.case_number
                            )))
                        }
                    };
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Who a step notifies. Lookup failures are logged and treated as nobody.
    async fn recipient_for(&self, complaint: &Complaint, step: &EscalationStep) -> Option<User> {
        match step.route_to {
            Some(role) => match self.directory.find_any_active(role).await {
                Ok(Some(user)) => Some(user),
                Ok(None) => {
                    warn!(
                        case = %complaint.case_number,
                        role = %role,
                        "No active staff for escalation, recording without target"
                    );
                    None
                }
                Err(e) => {
                    warn!(case = %complaint.case_number, role = %role, error = %e, "Directory lookup failed");
                    None
                }
            },
            None => {
                let assignee = complaint.assigned_to?;
                match self.repo.get_user(assignee).await {
                    Ok(user) => user,
                    Err(e) => {
                        warn!(case = %complaint.case_number, error = %e, "Assignee lookup failed");
                        None
                    }
                }
            }
        }
    }
}
