//! Case lifecycle service: staff status updates, queries, and re-swept assignment
//!
//! Manual updates go through the same compare-and-set as every other writer.
//! `escalated` is never a manual target; only the sweeper puts a complaint
//! there.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::external::Directory;
use crate::notify::{Message, Notifier};
use crate::status::{check_transition, ComplaintStatus, IllegalTransition};
use crate::store::{ComplaintFilter, SharedRepository, StatusChange, StoreError};
use crate::types::*;

/// Compare-and-set attempts for a manual update before giving up
const STATUS_WRITE_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Role {role} may not update complaint status")]
    Forbidden { role: Role },

    #[error("Complaints are escalated by the SLA sweeper only")]
    EscalationReserved,

    #[error("User {user} cannot take complaints: {reason}")]
    InvalidAssignee { user: UserId, reason: &'static str },

    #[error("Moving a complaint to assigned requires an assignee")]
    MissingAssignee,

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// A staff member's requested status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub actor_id: UserId,
    pub actor_role: Role,
    pub to: ComplaintStatus,
    /// Log note; also stored as resolution notes when resolving
    pub notes: Option<String>,
    /// Reassign along with the status change
    pub assign_to: Option<UserId>,
}

/// Outcome of [`CaseService::assign_unassigned_at`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSweep {
    pub assigned: Vec<(ComplaintId, UserId)>,
    /// Complaints still waiting for an officer
    pub remaining: usize,
}

pub struct CaseService {
    repo: SharedRepository,
    directory: Arc<dyn Directory>,
    notifier: Notifier,
}

impl CaseService {
    pub fn new(repo: SharedRepository, directory: Arc<dyn Directory>, notifier: Notifier) -> Self {
        Self {
            repo,
            directory,
            notifier,
        }
    }

    pub async fn update_status(
        &self,
        id: ComplaintId,
        update: StatusUpdate,
    ) -> LifecycleResult<Complaint> {
        self.update_status_at(id, update, Utc::now()).await
    }

    /// Apply a staff status change as of `now` and notify the reporter.
    pub async fn update_status_at(
        &self,
        id: ComplaintId,
        update: StatusUpdate,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Complaint> {
        if !update.actor_role.can_update_status() {
            return Err(LifecycleError::Forbidden {
                role: update.actor_role,
            });
        }
        if update.to == ComplaintStatus::Escalated {
            return Err(LifecycleError::EscalationReserved);
        }
        let assignee = match update.assign_to {
            Some(user) => Some(self.require_assignee(user).await?),
            None => None,
        };

        let mut attempt = 0;
        let updated = loop {
            attempt += 1;
            let current = self.require(id).await?;
            check_transition(current.status, update.to)?;
            if update.to == ComplaintStatus::Assigned
                && assignee.is_none()
                && current.assigned_to.is_none()
            {
                return Err(LifecycleError::MissingAssignee);
            }

            let change = StatusChange {
                expected: current.status,
                to: update.to,
                assign_to: update.assign_to,
                resolution_notes: match update.to {
                    ComplaintStatus::Resolved => update.notes.clone(),
                    _ => None,
                },
                actor: Some(update.actor_id),
                note: update
                    .notes
                    .clone()
                    .unwrap_or_else(|| format!("Status changed to {}", update.to)),
                at: now,
            };
            match self.repo.transition_status(id, &change).await {
                Ok(updated) => break updated,
                Err(e) if e.is_conflict() && attempt < STATUS_WRITE_ATTEMPTS => {
                    debug!(complaint = %id, attempt, "Status write conflict, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(
            case = %updated.case_number,
            status = %updated.status,
            actor = %update.actor_id,
            "Complaint status updated"
        );

        if let Some(assignee) = &assignee {
            self.notifier
                .send(assignee, Some(&updated), &Message::assigned(&updated), now)
                .await;
        }
        if let Some(reporter) = self.repo.get_user(updated.reporter_id).await? {
            self.notifier
                .send(&reporter, Some(&updated), &Message::status_changed(&updated), now)
                .await;
        }
        Ok(updated)
    }

    /// An active officer or supervisor, or the reason they cannot be one.
    async fn require_assignee(&self, user: UserId) -> LifecycleResult<User> {
        let found = self
            .repo
            .get_user(user)
            .await?
            .ok_or(LifecycleError::InvalidAssignee {
                user,
                reason: "no such user",
            })?;
        if !found.role.can_hold_cases() {
            return Err(LifecycleError::InvalidAssignee {
                user,
                reason: "role does not take complaints",
            });
        }
        if !found.active {
            return Err(LifecycleError::InvalidAssignee {
                user,
                reason: "account is inactive",
            });
        }
        Ok(found)
    }

    pub async fn get(&self, id: ComplaintId) -> LifecycleResult<Complaint> {
        self.require(id).await
    }

    /// Public tracking lookup.
    pub async fn by_case_number(&self, case_number: &str) -> LifecycleResult<Complaint> {
        self.repo
            .find_by_case_number(case_number)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("case {}", case_number)))
    }

    pub async fn list(&self, filter: &ComplaintFilter) -> LifecycleResult<Vec<Complaint>> {
        Ok(self.repo.list_complaints(filter).await?)
    }

    /// Open complaints past their deadline, most overdue first.
    pub async fn overdue_at(&self, now: DateTime<Utc>) -> LifecycleResult<Vec<Complaint>> {
        let open = self.repo.open_complaints().await?;
        Ok(open.into_iter().filter(|c| c.is_overdue_at(now)).collect())
    }

    pub async fn status_log(&self, id: ComplaintId) -> LifecycleResult<Vec<StatusLogEntry>> {
        self.require(id).await?;
        Ok(self.repo.status_log(id).await?)
    }

    pub async fn escalation_history(
        &self,
        id: ComplaintId,
    ) -> LifecycleResult<Vec<EscalationRecord>> {
        self.require(id).await?;
        Ok(self.repo.escalation_history(id).await?)
    }

    pub async fn notifications_for(&self, user_id: UserId) -> LifecycleResult<Vec<Notification>> {
        Ok(self.repo.notifications_for(user_id).await?)
    }

    pub async fn mark_notification_read(
        &self,
        user_id: UserId,
        notification_id: uuid::Uuid,
    ) -> LifecycleResult<()> {
        match self.repo.mark_notification_read(user_id, notification_id).await {
            Err(StoreError::NotFound(what)) => Err(LifecycleError::NotFound(what)),
            other => Ok(other?),
        }
    }

    /// Returns how many notifications were unread.
    pub async fn mark_all_read(&self, user_id: UserId) -> LifecycleResult<u64> {
        let marked = self.repo.mark_all_read(user_id).await?;
        debug!(user = %user_id, marked, "Notifications marked read");
        Ok(marked)
    }

    pub async fn assign_unassigned(&self) -> LifecycleResult<AssignmentSweep> {
        self.assign_unassigned_at(Utc::now()).await
    }

    /// Retry assignment for complaints the pipeline left unassigned.
    ///
    /// Stops early once no officer is available. A complaint that moved on
    /// since it was listed is skipped.
    pub async fn assign_unassigned_at(&self, now: DateTime<Utc>) -> LifecycleResult<AssignmentSweep> {
        let waiting: Vec<Complaint> = self
            .repo
            .open_complaints()
            .await?
            .into_iter()
            .filter(|c| c.status == ComplaintStatus::AiProcessed && c.assigned_to.is_none())
            .collect();

        let mut sweep = AssignmentSweep::default();
        for (index, complaint) in waiting.iter().enumerate() {
            let officer = match self.directory.find_least_loaded(Role::Officer).await? {
                Some(officer) => officer,
                None => {
                    sweep.remaining = waiting.len() - index;
                    info!(remaining = sweep.remaining, "No officer available for unassigned complaints");
                    break;
                }
            };

            let change = StatusChange {
                expected: ComplaintStatus::AiProcessed,
                to: ComplaintStatus::Assigned,
                assign_to: Some(officer.id),
                resolution_notes: None,
                actor: None,
                note: format!("Auto-assigned to officer: {}", officer.full_name),
                at: now,
            };
            match self.repo.transition_status(complaint.id, &change).await {
                Ok(updated) => {
                    info!(case = %updated.case_number, officer = %officer.id, "Complaint assigned");
                    self.notifier
                        .send(&officer, Some(&updated), &Message::assigned(&updated), now)
                        .await;
                    sweep.assigned.push((updated.id, officer.id));
                }
                Err(e) if e.is_conflict() => {
                    debug!(case = %complaint.case_number, "Complaint moved on before assignment");
                }
                Err(e) => {
                    warn!(case = %complaint.case_number, error = %e, "Assignment failed");
                    sweep.remaining += 1;
                }
            }
        }
        Ok(sweep)
    }

    async fn require(&self, id: ComplaintId) -> LifecycleResult<Complaint> {
        self.repo
            .get_complaint(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("complaint {}", id)))
    }
}
