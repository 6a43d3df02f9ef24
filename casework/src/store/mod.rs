//! Repository abstraction over the shared casework store
//!
//! The pipeline, the lifecycle service, the escalation sweeper and reporting
//! all go through [`Repository`]. Two implementations:
//!
//! - [`MemoryStore`]: lock-protected maps, always available; used by tests
//!   and single-process deployments
//! - `PgStore` (feature `postgres`): PostgreSQL via `tokio-postgres`
//!
//! # Serialization points
//!
//! Two writes must be atomic with respect to concurrent writers:
//!
//! - [`Repository::next_case_sequence`] hands out a per-day counter value
//!   exactly once; case numbers also carry a uniqueness check on insert.
//! - [`Repository::advance_escalation`] and [`Repository::transition_status`]
//!   are compare-and-set operations. When the stored tier/status differs from
//!   the expected one they fail with [`StoreError::Conflict`] and change nothing.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::ComplaintHistory;
use crate::status::ComplaintStatus;
use crate::types::*;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A compare-and-set or uniqueness check lost a race. Retried by the writer.
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<ParseLabelError> for StoreError {
    fn from(e: ParseLabelError) -> Self {
        Self::Corrupt(e.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a repository
pub type SharedRepository = Arc<dyn Repository>;

/// Listing filter; every `Some` field must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<UserId>,
    pub reporter_id: Option<UserId>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ComplaintFilter {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            assigned_to: None,
            reporter_id: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl ComplaintFilter {
    pub fn matches(&self, c: &Complaint) -> bool {
        self.status.map_or(true, |s| c.status == s)
            && self.priority.map_or(true, |p| c.priority == p)
            && self.assigned_to.map_or(true, |u| c.assigned_to == Some(u))
            && self.reporter_id.map_or(true, |u| c.reporter_id == u)
    }
}

/// Status compare-and-set request.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// Status the writer last observed; the write fails with `Conflict` otherwise
    pub expected: ComplaintStatus,
    pub to: ComplaintStatus,
    /// Set the assignee along with the status
    pub assign_to: Option<UserId>,
    pub resolution_notes: Option<String>,
    pub actor: Option<UserId>,
    pub note: String,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    /// The audit entry this change appends.
    pub fn log_entry(&self, complaint_id: ComplaintId) -> StatusLogEntry {
        StatusLogEntry::new(
            complaint_id,
            Some(self.expected),
            self.to,
            self.actor,
            self.note.clone(),
            self.at,
        )
    }
}

/// Escalation compare-and-set request.
#[derive(Debug, Clone)]
pub struct EscalationAdvance {
    /// Tier the sweeper last observed
    pub expected: Option<EscalationTier>,
    /// Appended on success; `record.to_tier` becomes the complaint's tier
    pub record: EscalationRecord,
    /// Also move the status to `escalated` (level 2)
    pub mark_escalated: bool,
}

/// Complaints for one water body inside a trailing window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComplaintWindow {
    pub count: u64,
    pub earliest: Option<DateTime<Utc>>,
}

/// Aggregate counts behind the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub total: u64,
    /// Not resolved or rejected
    pub active: u64,
    pub resolved: u64,
    /// Critical priority, open or closed
    pub critical: u64,
    /// Open and past the SLA deadline
    pub overdue: u64,
    pub avg_resolution_hours: Option<f64>,
    /// Water bodies at medium or high risk
    pub water_bodies_at_risk: u64,
}

/// Read/write operations of the casework store
#[async_trait]
pub trait Repository: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    async fn put_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Active users with `role`, ordered by id.
    async fn active_users(&self, role: Role) -> StoreResult<Vec<User>>;

    /// Active users with `role` and their count of non-terminal assigned complaints.
    async fn staff_workloads(&self, role: Role) -> StoreResult<Vec<StaffWorkload>>;

    // =========================================================================
    // Water bodies
    // =========================================================================

    async fn put_water_body(&self, water_body: &WaterBody) -> StoreResult<()>;

    async fn get_water_body(&self, id: WaterBodyId) -> StoreResult<Option<WaterBody>>;

    async fn list_water_bodies(&self) -> StoreResult<Vec<WaterBody>>;

    /// Update the water body's risk fields and append the history row, atomically.
    async fn record_risk(&self, entry: &RiskHistoryEntry) -> StoreResult<()>;

    async fn risk_history(&self, water_body_id: WaterBodyId) -> StoreResult<Vec<RiskHistoryEntry>>;

    /// Totals over every complaint filed against the water body; `recent`
    /// counts those created at or after `recent_since`.
    async fn complaint_history(
        &self,
        water_body_id: WaterBodyId,
        recent_since: DateTime<Utc>,
    ) -> StoreResult<ComplaintHistory>;

    async fn complaint_window(
        &self,
        water_body_id: WaterBodyId,
        since: DateTime<Utc>,
    ) -> StoreResult<ComplaintWindow>;

    // =========================================================================
    // Complaints
    // =========================================================================

    /// Next case-number sequence value for `day`, starting after the number of
    /// complaints already created that day. Never returns the same value twice
    /// for the same day.
    async fn next_case_sequence(&self, day: NaiveDate) -> StoreResult<u64>;

    /// Insert a new complaint with its first status log entry.
    ///
    /// Fails with `Conflict` if the id or case number already exists.
    async fn insert_complaint(
        &self,
        complaint: &Complaint,
        initial: &StatusLogEntry,
    ) -> StoreResult<()>;

    async fn get_complaint(&self, id: ComplaintId) -> StoreResult<Option<Complaint>>;

    async fn find_by_case_number(&self, case_number: &str) -> StoreResult<Option<Complaint>>;

    /// Filtered listing, highest severity first, then newest first.
    async fn list_complaints(&self, filter: &ComplaintFilter) -> StoreResult<Vec<Complaint>>;

    /// Every non-terminal complaint, ascending by SLA deadline.
    async fn open_complaints(&self) -> StoreResult<Vec<Complaint>>;

    /// Compare-and-set the status and append the status log entry.
    async fn transition_status(
        &self,
        id: ComplaintId,
        change: &StatusChange,
    ) -> StoreResult<Complaint>;

    /// Compare-and-set the escalation tier and append the escalation record.
    ///
    /// Fails with `Conflict` if the stored tier differs from `expected` or the
    /// complaint has been closed.
    async fn advance_escalation(
        &self,
        id: ComplaintId,
        advance: &EscalationAdvance,
    ) -> StoreResult<Complaint>;

    async fn status_log(&self, id: ComplaintId) -> StoreResult<Vec<StatusLogEntry>>;

    async fn escalation_history(&self, id: ComplaintId) -> StoreResult<Vec<EscalationRecord>>;

    async fn dashboard_counts(&self, now: DateTime<Utc>) -> StoreResult<DashboardCounts>;

    // =========================================================================
    // Notifications
    // =========================================================================

    async fn record_notification(&self, notification: &Notification) -> StoreResult<()>;

    async fn notifications_for(&self, user_id: UserId) -> StoreResult<Vec<Notification>>;

    /// Mark one of `user_id`'s notifications read. `NotFound` if the
    /// notification does not exist or belongs to someone else.
    async fn mark_notification_read(&self, user_id: UserId, id: Uuid) -> StoreResult<()>;

    /// Mark every unread notification of `user_id` read; returns how many changed.
    async fn mark_all_read(&self, user_id: UserId) -> StoreResult<u64>;
}

/// Validate an escalation request against the stored complaint.
///
/// Shared by the store implementations so both enforce the same rules.
pub(crate) fn check_escalation(
    complaint: &Complaint,
    advance: &EscalationAdvance,
) -> StoreResult<()> {
    if complaint.is_terminal() {
        return Err(StoreError::Conflict(format!(
            "complaint {} closed ({})",
            complaint.case_number, complaint.status
        )));
    }
    if complaint.escalation_tier != advance.expected {
        return Err(StoreError::Conflict(format!(
            "complaint {} tier is {:?}, expected {:?}",
            complaint.case_number, complaint.escalation_tier, advance.expected
        )));
    }
    if Some(advance.record.to_tier) <= advance.expected {
        return Err(StoreError::IllegalTransition(format!(
            "escalation {:?} → {} does not advance",
            advance.expected, advance.record.to_tier
        )));
    }
    Ok(())
}

/// Validate a status change against the stored complaint.
pub(crate) fn check_status_change(complaint: &Complaint, change: &StatusChange) -> StoreResult<()> {
    if complaint.status != change.expected {
        return Err(StoreError::Conflict(format!(
            "complaint {} status is {}, expected {}",
            complaint.case_number, complaint.status, change.expected
        )));
    }
    crate::status::check_transition(change.expected, change.to)
        .map_err(|e| StoreError::IllegalTransition(e.to_string()))
}
