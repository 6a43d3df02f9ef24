//! In-memory repository
//!
//! All tables live behind a single `RwLock`, so every trait method is one
//! critical section and the compare-and-set operations are trivially atomic.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::*;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    water_bodies: HashMap<WaterBodyId, WaterBody>,
    risk_history: Vec<RiskHistoryEntry>,
    complaints: HashMap<ComplaintId, Complaint>,
    case_numbers: HashMap<String, ComplaintId>,
    sequences: HashMap<NaiveDate, u64>,
    status_log: Vec<StatusLogEntry>,
    escalations: Vec<EscalationRecord>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn complaint_mut(&mut self, id: ComplaintId) -> StoreResult<&mut Complaint> {
        self.complaints
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("complaint {}", id)))
    }

    fn open_assigned_to(&self, user_id: UserId) -> usize {
        self.complaints
            .values()
            .filter(|c| c.assigned_to == Some(user_id) && !c.is_terminal())
            .count()
    }
}

/// Repository backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn put_user(&self, user: &User) -> StoreResult<()> {
        self.write()?.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn active_users(&self, role: Role) -> StoreResult<Vec<User>> {
        let tables = self.read()?;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.active && u.role == role)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn staff_workloads(&self, role: Role) -> StoreResult<Vec<StaffWorkload>> {
        let tables = self.read()?;
        let mut workloads: Vec<StaffWorkload> = tables
            .users
            .values()
            .filter(|u| u.active && u.role == role)
            .map(|u| StaffWorkload {
                user: u.clone(),
                open_cases: tables.open_assigned_to(u.id),
            })
            .collect();
        workloads.sort_by_key(|w| w.user.id);
        Ok(workloads)
    }

    async fn put_water_body(&self, water_body: &WaterBody) -> StoreResult<()> {
        self.write()?
            .water_bodies
            .insert(water_body.id, water_body.clone());
        Ok(())
    }

    async fn get_water_body(&self, id: WaterBodyId) -> StoreResult<Option<WaterBody>> {
        Ok(self.read()?.water_bodies.get(&id).cloned())
    }

    async fn list_water_bodies(&self) -> StoreResult<Vec<WaterBody>> {
        let tables = self.read()?;
        let mut bodies: Vec<WaterBody> = tables.water_bodies.values().cloned().collect();
        bodies.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(bodies)
    }

    async fn record_risk(&self, entry: &RiskHistoryEntry) -> StoreResult<()> {
        let mut tables = self.write()?;
        let body = tables
            .water_bodies
            .get_mut(&entry.water_body_id)
            .ok_or_else(|| StoreError::NotFound(format!("water body {}", entry.water_body_id)))?;
        body.risk_score = entry.risk_score;
        body.risk_level = entry.risk_level;
        body.risk_updated_at = Some(entry.calculated_at);
        tables.risk_history.push(entry.clone());
        Ok(())
    }

    async fn risk_history(&self, water_body_id: WaterBodyId) -> StoreResult<Vec<RiskHistoryEntry>> {
        let tables = self.read()?;
        let mut rows: Vec<RiskHistoryEntry> = tables
            .risk_history
            .iter()
            .filter(|r| r.water_body_id == water_body_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.calculated_at);
        Ok(rows)
    }

    async fn complaint_history(
        &self,
        water_body_id: WaterBodyId,
        recent_since: DateTime<Utc>,
    ) -> StoreResult<ComplaintHistory> {
        let tables = self.read()?;
        let mut history = ComplaintHistory::default();
        for c in tables
            .complaints
            .values()
            .filter(|c| c.water_body_id == Some(water_body_id))
        {
            history.total += 1;
            if c.classification.violation_type == ViolationType::Construction {
                history.construction += 1;
            }
            if c.priority == Priority::Critical {
                history.critical += 1;
            }
            if c.created_at >= recent_since {
                history.recent += 1;
            }
        }
        Ok(history)
    }

    async fn complaint_window(
        &self,
        water_body_id: WaterBodyId,
        since: DateTime<Utc>,
    ) -> StoreResult<ComplaintWindow> {
        let tables = self.read()?;
        let mut window = ComplaintWindow::default();
        for c in tables
            .complaints
            .values()
            .filter(|c| c.water_body_id == Some(water_body_id) && c.created_at >= since)
        {
            window.count += 1;
            window.earliest = Some(match window.earliest {
                Some(e) if e <= c.created_at => e,
                _ => c.created_at,
            });
        }
        Ok(window)
    }

    async fn next_case_sequence(&self, day: NaiveDate) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let already_filed = tables
            .complaints
            .values()
            .filter(|c| c.created_at.date_naive() == day)
            .count() as u64;
        let counter = tables.sequences.entry(day).or_insert(already_filed);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_complaint(
        &self,
        complaint: &Complaint,
        initial: &StatusLogEntry,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.case_numbers.contains_key(&complaint.case_number) {
            return Err(StoreError::Conflict(format!(
                "case number {} already issued",
                complaint.case_number
            )));
        }
        if tables.complaints.contains_key(&complaint.id) {
            return Err(StoreError::Conflict(format!(
                "complaint {} already exists",
                complaint.id
            )));
        }
        tables
            .case_numbers
            .insert(complaint.case_number.clone(), complaint.id);
        tables.complaints.insert(complaint.id, complaint.clone());
        tables.status_log.push(initial.clone());
        Ok(())
    }

    async fn get_complaint(&self, id: ComplaintId) -> StoreResult<Option<Complaint>> {
        Ok(self.read()?.complaints.get(&id).cloned())
    }

    async fn find_by_case_number(&self, case_number: &str) -> StoreResult<Option<Complaint>> {
        let tables = self.read()?;
        Ok(tables
            .case_numbers
            .get(case_number)
            .and_then(|id| tables.complaints.get(id))
            .cloned())
    }

    async fn list_complaints(&self, filter: &ComplaintFilter) -> StoreResult<Vec<Complaint>> {
        let tables = self.read()?;
        let mut rows: Vec<Complaint> = tables
            .complaints
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.severity_score
                .cmp(&a.severity_score)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(rows
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn open_complaints(&self) -> StoreResult<Vec<Complaint>> {
        let tables = self.read()?;
        let mut rows: Vec<Complaint> = tables
            .complaints
            .values()
            .filter(|c| !c.is_terminal())
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.sla_deadline.cmp(&b.sla_deadline).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn transition_status(
        &self,
        id: ComplaintId,
        change: &StatusChange,
    ) -> StoreResult<Complaint> {
        let mut tables = self.write()?;
        let complaint = tables.complaint_mut(id)?;
        check_status_change(complaint, change)?;

        complaint.status = change.to;
        if let Some(assignee) = change.assign_to {
            complaint.assigned_to = Some(assignee);
        }
        if change.to == ComplaintStatus::Resolved {
            complaint.resolved_at = Some(change.at);
        }
        if change.resolution_notes.is_some() {
            complaint.resolution_notes = change.resolution_notes.clone();
        }
        complaint.updated_at = change.at;
        let updated = complaint.clone();

        tables.status_log.push(change.log_entry(id));
        Ok(updated)
    }

    async fn advance_escalation(
        &self,
        id: ComplaintId,
        advance: &EscalationAdvance,
    ) -> StoreResult<Complaint> {
        let mut tables = self.write()?;
        let complaint = tables.complaint_mut(id)?;
        check_escalation(complaint, advance)?;

        let at = advance.record.at;
        complaint.escalation_tier = Some(advance.record.to_tier);
        complaint.escalated_at = Some(at);
        complaint.updated_at = at;

        let mut status_entry = None;
        if advance.mark_escalated && complaint.status.can_transition_to(ComplaintStatus::Escalated)
        {
            status_entry = Some(StatusLogEntry::new(
                id,
                Some(complaint.status),
                ComplaintStatus::Escalated,
                None,
                advance.record.reason.clone(),
                at,
            ));
            complaint.status = ComplaintStatus::Escalated;
        }
        let updated = complaint.clone();

        if let Some(entry) = status_entry {
            tables.status_log.push(entry);
        }
        tables.escalations.push(advance.record.clone());
        Ok(updated)
    }

    async fn status_log(&self, id: ComplaintId) -> StoreResult<Vec<StatusLogEntry>> {
        let tables = self.read()?;
        Ok(tables
            .status_log
            .iter()
            .filter(|e| e.complaint_id == id)
            .cloned()
            .collect())
    }

    async fn escalation_history(&self, id: ComplaintId) -> StoreResult<Vec<EscalationRecord>> {
        let tables = self.read()?;
        Ok(tables
            .escalations
            .iter()
            .filter(|e| e.complaint_id == id)
            .cloned()
            .collect())
    }

    async fn dashboard_counts(&self, now: DateTime<Utc>) -> StoreResult<DashboardCounts> {
        let tables = self.read()?;
        let mut counts = DashboardCounts::default();
        let mut resolution_hours = Vec::new();

        for c in tables.complaints.values() {
            counts.total += 1;
            if c.priority == Priority::Critical {
                counts.critical += 1;
            }
            if c.is_terminal() {
                if c.status == ComplaintStatus::Resolved {
                    counts.resolved += 1;
                    if let Some(resolved_at) = c.resolved_at {
                        resolution_hours
                            .push((resolved_at - c.created_at).num_seconds() as f64 / 3600.0);
                    }
                }
            } else {
                counts.active += 1;
                if c.is_overdue_at(now) {
                    counts.overdue += 1;
                }
            }
        }
        if !resolution_hours.is_empty() {
            counts.avg_resolution_hours =
                Some(resolution_hours.iter().sum::<f64>() / resolution_hours.len() as f64);
        }
        counts.water_bodies_at_risk = tables
            .water_bodies
            .values()
            .filter(|w| w.risk_level >= RiskLevel::Medium)
            .count() as u64;
        Ok(counts)
    }

    async fn record_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.write()?.notifications.push(notification.clone());
        Ok(())
    }

    async fn notifications_for(&self, user_id: UserId) -> StoreResult<Vec<Notification>> {
        let tables = self.read()?;
        Ok(tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, user_id: UserId, id: Uuid) -> StoreResult<()> {
        let mut tables = self.write()?;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("notification {}", id)))?;
        notification.read = true;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let mut marked = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            marked += 1;
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn complaint(case_number: &str, status: ComplaintStatus) -> Complaint {
        Complaint {
            id: Uuid::new_v4(),
            case_number: case_number.to_string(),
            reporter_id: Uuid::new_v4(),
            water_body_id: None,
            category: WaterBodyKind::Lake,
            description: None,
            address: None,
            latitude: 12.97,
            longitude: 77.59,
            classification: Classification::unknown(),
            severity_score: 50,
            priority: Priority::Medium,
            status,
            assigned_to: None,
            sla_deadline: now() + Duration::days(7),
            resolved_at: None,
            resolution_notes: None,
            escalation_tier: None,
            escalated_at: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    async fn insert(store: &MemoryStore, c: &Complaint) {
        let entry = StatusLogEntry::new(c.id, None, c.status, None, "created", c.created_at);
        store.insert_complaint(c, &entry).await.unwrap();
    }

    fn advance(c: &Complaint, expected: Option<EscalationTier>, to: EscalationTier) -> EscalationAdvance {
        EscalationAdvance {
            expected,
            record: EscalationRecord {
                id: Uuid::new_v4(),
                complaint_id: c.id,
                from_tier: expected,
                to_tier: to,
                from_officer: None,
                to_officer: None,
                reason: "test".into(),
                at: now(),
            },
            mark_escalated: to == EscalationTier::Level2,
        }
    }

    /// Test: Duplicate case numbers are rejected
    #[tokio::test]
    async fn test_duplicate_case_number_conflicts() {
        let store = MemoryStore::new();
        insert(&store, &complaint("AQS-20240501-00001", ComplaintStatus::AiProcessed)).await;

        let dup = complaint("AQS-20240501-00001", ComplaintStatus::AiProcessed);
        let entry = StatusLogEntry::new(dup.id, None, dup.status, None, "created", now());
        let err = store.insert_complaint(&dup, &entry).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(store.get_complaint(dup.id).await.unwrap().is_none());
    }

    /// Test: Sequence starts after complaints already filed that day
    #[tokio::test]
    async fn test_sequence_seeded_from_existing() {
        let store = MemoryStore::new();
        insert(&store, &complaint("AQS-20240501-00001", ComplaintStatus::AiProcessed)).await;
        insert(&store, &complaint("AQS-20240501-00002", ComplaintStatus::AiProcessed)).await;

        let day = now().date_naive();
        assert_eq!(store.next_case_sequence(day).await.unwrap(), 3);
        assert_eq!(store.next_case_sequence(day).await.unwrap(), 4);

        let other_day = day.succ_opt().unwrap();
        assert_eq!(store.next_case_sequence(other_day).await.unwrap(), 1);
    }

    /// Test: Escalation CAS rejects a stale expected tier
    #[tokio::test]
    async fn test_escalation_cas() {
        let store = MemoryStore::new();
        let c = complaint("AQS-20240501-00001", ComplaintStatus::Assigned);
        insert(&store, &c).await;

        let updated = store
            .advance_escalation(c.id, &advance(&c, None, EscalationTier::Level1))
            .await
            .unwrap();
        assert_eq!(updated.escalation_tier, Some(EscalationTier::Level1));

        // A second writer that also observed `None` loses.
        let err = store
            .advance_escalation(c.id, &advance(&c, None, EscalationTier::Level1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.escalation_history(c.id).await.unwrap().len(), 1);
    }

    /// Test: Level 2 moves the status to escalated with a system log entry
    #[tokio::test]
    async fn test_level_two_marks_status() {
        let store = MemoryStore::new();
        let c = complaint("AQS-20240501-00001", ComplaintStatus::InProgress);
        insert(&store, &c).await;

        let updated = store
            .advance_escalation(c.id, &advance(&c, None, EscalationTier::Level2))
            .await
            .unwrap();
        assert_eq!(updated.status, ComplaintStatus::Escalated);

        let log = store.status_log(c.id).await.unwrap();
        let last = log.last().unwrap();
        assert_eq!(last.from_status, Some(ComplaintStatus::InProgress));
        assert_eq!(last.to_status, ComplaintStatus::Escalated);
        assert_eq!(last.actor, None);
    }

    /// Test: Closed complaints cannot be escalated
    #[tokio::test]
    async fn test_terminal_not_escalated() {
        let store = MemoryStore::new();
        let c = complaint("AQS-20240501-00001", ComplaintStatus::Resolved);
        insert(&store, &c).await;

        let err = store
            .advance_escalation(c.id, &advance(&c, None, EscalationTier::Level1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        let stored = store.get_complaint(c.id).await.unwrap().unwrap();
        assert_eq!(stored.escalation_tier, None);
    }

    /// Test: Escalation never moves backwards
    #[tokio::test]
    async fn test_escalation_must_advance() {
        let store = MemoryStore::new();
        let c = complaint("AQS-20240501-00001", ComplaintStatus::Assigned);
        insert(&store, &c).await;
        store
            .advance_escalation(c.id, &advance(&c, None, EscalationTier::Level2))
            .await
            .unwrap();

        let err = store
            .advance_escalation(
                c.id,
                &advance(&c, Some(EscalationTier::Level2), EscalationTier::Level1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition(_)));
    }

    /// Test: Status CAS checks the expected status and the transition graph
    #[tokio::test]
    async fn test_transition_status_cas() {
        let store = MemoryStore::new();
        let c = complaint("AQS-20240501-00001", ComplaintStatus::InProgress);
        insert(&store, &c).await;

        let change = |expected, to| StatusChange {
            expected,
            to,
            assign_to: None,
            resolution_notes: None,
            actor: None,
            note: String::new(),
            at: now() + Duration::hours(1),
        };

        let err = store
            .transition_status(c.id, &change(ComplaintStatus::Assigned, ComplaintStatus::InProgress))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let err = store
            .transition_status(c.id, &change(ComplaintStatus::InProgress, ComplaintStatus::Validated))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition(_)));

        let resolved = store
            .transition_status(c.id, &change(ComplaintStatus::InProgress, ComplaintStatus::Resolved))
            .await
            .unwrap();
        assert_eq!(resolved.resolved_at, Some(now() + Duration::hours(1)));
        assert_eq!(store.status_log(c.id).await.unwrap().len(), 2);
    }

    /// Test: Workload counts only open complaints
    #[tokio::test]
    async fn test_staff_workloads() {
        let store = MemoryStore::new();
        let officer = User::new("Asha", "asha@example.org", Role::Officer);
        let mut retired = User::new("Ravi", "ravi@example.org", Role::Officer);
        retired.active = false;
        store.put_user(&officer).await.unwrap();
        store.put_user(&retired).await.unwrap();

        let mut open = complaint("AQS-20240501-00001", ComplaintStatus::Assigned);
        open.assigned_to = Some(officer.id);
        let mut closed = complaint("AQS-20240501-00002", ComplaintStatus::Resolved);
        closed.assigned_to = Some(officer.id);
        insert(&store, &open).await;
        insert(&store, &closed).await;

        let workloads = store.staff_workloads(Role::Officer).await.unwrap();
        assert_eq!(workloads.len(), 1);
        assert_eq!(workloads[0].user.id, officer.id);
        assert_eq!(workloads[0].open_cases, 1);
    }
}
