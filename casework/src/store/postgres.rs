//! PostgreSQL repository
//!
//! One connection behind an async mutex. Compare-and-set writes run inside a
//! transaction that locks the complaint row (`SELECT ... FOR UPDATE`) before
//! checking the expected tier/status, so concurrent sweepers serialize on the
//! row and the loser observes the winner's write.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{info, warn};

use super::schema::{COMPLAINT_COLUMNS, SCHEMA_SQL};
use super::*;

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            StoreError::Conflict(e.to_string())
        } else {
            StoreError::Backend(e.to_string())
        }
    }
}

/// Repository backed by PostgreSQL
pub struct PgStore {
    client: Mutex<Client>,
}

impl PgStore {
    /// Connect and spawn the connection driver on the current runtime.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection closed");
            }
        });
        info!("Connected to PostgreSQL");
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    /// Create tables and indexes if missing.
    pub async fn migrate(&self) -> StoreResult<()> {
        self.client.lock().await.batch_execute(SCHEMA_SQL).await?;
        Ok(())
    }
}

fn label<T>(row: &Row, column: &str) -> StoreResult<T>
where
    T: FromStr<Err = ParseLabelError>,
{
    let raw: String = row.try_get(column)?;
    Ok(raw.parse()?)
}

fn optional_label<T>(row: &Row, column: &str) -> StoreResult<Option<T>>
where
    T: FromStr<Err = ParseLabelError>,
{
    let raw: Option<String> = row.try_get(column)?;
    Ok(raw.map(|s| s.parse()).transpose()?)
}

fn row_to_user(row: &Row) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        role: label(row, "role")?,
        active: row.try_get("active")?,
    })
}

fn row_to_water_body(row: &Row) -> StoreResult<WaterBody> {
    Ok(WaterBody {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        kind: label(row, "kind")?,
        sensitivity_score: row.try_get("sensitivity_score")?,
        risk_score: row.try_get("risk_score")?,
        risk_level: label(row, "risk_level")?,
        risk_updated_at: row.try_get("risk_updated_at")?,
    })
}

fn row_to_complaint(row: &Row) -> StoreResult<Complaint> {
    let violation: String = row.try_get("violation_type")?;
    let urgency: String = row.try_get("urgency")?;
    Ok(Complaint {
        id: row.try_get("id")?,
        case_number: row.try_get("case_number")?,
        reporter_id: row.try_get("reporter_id")?,
        water_body_id: row.try_get("water_body_id")?,
        category: label(row, "category")?,
        description: row.try_get("description")?,
        address: row.try_get("address")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        classification: Classification::new(
            ViolationType::from_label_lossy(&violation),
            row.try_get("confidence")?,
            Urgency::from_label_lossy(&urgency),
        ),
        severity_score: row.try_get("severity_score")?,
        priority: label(row, "priority")?,
        status: label(row, "status")?,
        assigned_to: row.try_get("assigned_to")?,
        sla_deadline: row.try_get("sla_deadline")?,
        resolved_at: row.try_get("resolved_at")?,
        resolution_notes: row.try_get("resolution_notes")?,
        escalation_tier: optional_label(row, "escalation_tier")?,
        escalated_at: row.try_get("escalated_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_status_entry(row: &Row) -> StoreResult<StatusLogEntry> {
    Ok(StatusLogEntry {
        id: row.try_get("id")?,
        complaint_id: row.try_get("complaint_id")?,
        from_status: optional_label(row, "from_status")?,
        to_status: label(row, "to_status")?,
        actor: row.try_get("actor")?,
        note: row.try_get("note")?,
        at: row.try_get("at")?,
    })
}

fn row_to_escalation(row: &Row) -> StoreResult<EscalationRecord> {
    Ok(EscalationRecord {
        id: row.try_get("id")?,
        complaint_id: row.try_get("complaint_id")?,
        from_tier: optional_label(row, "from_tier")?,
        to_tier: label(row, "to_tier")?,
        from_officer: row.try_get("from_officer")?,
        to_officer: row.try_get("to_officer")?,
        reason: row.try_get("reason")?,
        at: row.try_get("at")?,
    })
}

fn row_to_notification(row: &Row) -> StoreResult<Notification> {
    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        complaint_id: row.try_get("complaint_id")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        read: row.try_get("read")?,
        sent_at: row.try_get("sent_at")?,
    })
}

fn count(row: &Row, idx: usize) -> StoreResult<u64> {
    let n: i64 = row.try_get(idx)?;
    Ok(n.max(0) as u64)
}

const INSERT_STATUS_LOG: &str = "INSERT INTO status_log \
     (id, complaint_id, from_status, to_status, actor, note, at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)";

#[async_trait]
impl Repository for PgStore {
    async fn put_user(&self, user: &User) -> StoreResult<()> {
        let client = self.client.lock().await;
        client
            .execute(
                "INSERT INTO users (id, full_name, email, role, active) VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, \
                 email = EXCLUDED.email, role = EXCLUDED.role, active = EXCLUDED.active",
                &[&user.id, &user.full_name, &user.email, &user.role.as_str(), &user.active],
            )
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt("SELECT * FROM users WHERE id = $1", &[&id])
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn active_users(&self, role: Role) -> StoreResult<Vec<User>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT * FROM users WHERE active AND role = $1 ORDER BY id",
                &[&role.as_str()],
            )
            .await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn staff_workloads(&self, role: Role) -> StoreResult<Vec<StaffWorkload>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT u.id, u.full_name, u.email, u.role, u.active, COUNT(c.id) AS open_cases \
                 FROM users u \
                 LEFT JOIN complaints c ON c.assigned_to = u.id \
                   AND c.status NOT IN ('resolved', 'rejected') \
                 WHERE u.active AND u.role = $1 \
                 GROUP BY u.id ORDER BY u.id",
                &[&role.as_str()],
            )
            .await?;
        rows.iter()
            .map(|row| {
                let open: i64 = row.try_get("open_cases")?;
                Ok(StaffWorkload {
                    user: row_to_user(row)?,
                    open_cases: open.max(0) as usize,
                })
            })
            .collect()
    }

    async fn put_water_body(&self, water_body: &WaterBody) -> StoreResult<()> {
        let client = self.client.lock().await;
        client
            .execute(
                "INSERT INTO water_bodies \
                 (id, name, kind, sensitivity_score, risk_score, risk_level, risk_updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, kind = EXCLUDED.kind, \
                 sensitivity_score = EXCLUDED.sensitivity_score",
                &[
                    &water_body.id,
                    &water_body.name,
                    &water_body.kind.as_str(),
                    &water_body.sensitivity_score,
                    &water_body.risk_score,
                    &water_body.risk_level.as_str(),
                    &water_body.risk_updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_water_body(&self, id: WaterBodyId) -> StoreResult<Option<WaterBody>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt("SELECT * FROM water_bodies WHERE id = $1", &[&id])
            .await?;
        row.as_ref().map(row_to_water_body).transpose()
    }

    async fn list_water_bodies(&self) -> StoreResult<Vec<WaterBody>> {
        let client = self.client.lock().await;
        let rows = client
            .query("SELECT * FROM water_bodies ORDER BY name, id", &[])
            .await?;
        rows.iter().map(row_to_water_body).collect()
    }

    async fn record_risk(&self, entry: &RiskHistoryEntry) -> StoreResult<()> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let updated = tx
            .execute(
                "UPDATE water_bodies SET risk_score = $2, risk_level = $3, risk_updated_at = $4 \
                 WHERE id = $1",
                &[
                    &entry.water_body_id,
                    &entry.risk_score,
                    &entry.risk_level.as_str(),
                    &entry.calculated_at,
                ],
            )
            .await?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!(
                "water body {}",
                entry.water_body_id
            )));
        }
        tx.execute(
            "INSERT INTO risk_history (id, water_body_id, risk_score, risk_level, \
             complaint_density_score, construction_score, urban_growth_score, shrinkage_score, \
             calculated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            &[
                &entry.id,
                &entry.water_body_id,
                &entry.risk_score,
                &entry.risk_level.as_str(),
                &entry.complaint_density_score,
                &entry.construction_score,
                &entry.urban_growth_score,
                &entry.shrinkage_score,
                &entry.calculated_at,
            ],
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn risk_history(&self, water_body_id: WaterBodyId) -> StoreResult<Vec<RiskHistoryEntry>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT * FROM risk_history WHERE water_body_id = $1 ORDER BY calculated_at",
                &[&water_body_id],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(RiskHistoryEntry {
                    id: row.try_get("id")?,
                    water_body_id: row.try_get("water_body_id")?,
                    risk_score: row.try_get("risk_score")?,
                    risk_level: label(row, "risk_level")?,
                    complaint_density_score: row.try_get("complaint_density_score")?,
                    construction_score: row.try_get("construction_score")?,
                    urban_growth_score: row.try_get("urban_growth_score")?,
                    shrinkage_score: row.try_get("shrinkage_score")?,
                    calculated_at: row.try_get("calculated_at")?,
                })
            })
            .collect()
    }

    async fn complaint_history(
        &self,
        water_body_id: WaterBodyId,
        recent_since: DateTime<Utc>,
    ) -> StoreResult<ComplaintHistory> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "SELECT COUNT(*), \
                   COUNT(*) FILTER (WHERE violation_type = 'construction'), \
                   COUNT(*) FILTER (WHERE priority = 'critical'), \
                   COUNT(*) FILTER (WHERE created_at >= $2) \
                 FROM complaints WHERE water_body_id = $1",
                &[&water_body_id, &recent_since],
            )
            .await?;
        Ok(ComplaintHistory {
            total: count(&row, 0)?,
            construction: count(&row, 1)?,
            critical: count(&row, 2)?,
            recent: count(&row, 3)?,
        })
    }

    async fn complaint_window(
        &self,
        water_body_id: WaterBodyId,
        since: DateTime<Utc>,
    ) -> StoreResult<ComplaintWindow> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "SELECT COUNT(*), MIN(created_at) FROM complaints \
                 WHERE water_body_id = $1 AND created_at >= $2",
                &[&water_body_id, &since],
            )
            .await?;
        Ok(ComplaintWindow {
            count: count(&row, 0)?,
            earliest: row.try_get(1)?,
        })
    }

    async fn next_case_sequence(&self, day: NaiveDate) -> StoreResult<u64> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO case_sequences (day, last_value) \
                 VALUES ($1, (SELECT COUNT(*) FROM complaints \
                              WHERE (created_at AT TIME ZONE 'UTC')::date = $1) + 1) \
                 ON CONFLICT (day) DO UPDATE SET last_value = case_sequences.last_value + 1 \
                 RETURNING last_value",
                &[&day],
            )
            .await?;
        count(&row, 0)
    }

    async fn insert_complaint(
        &self,
        complaint: &Complaint,
        initial: &StatusLogEntry,
    ) -> StoreResult<()> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let sql = format!(
            "INSERT INTO complaints ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
              $19, $20, $21, $22, $23)",
            COMPLAINT_COLUMNS
        );
        let tier = complaint.escalation_tier.map(|t| t.as_str());
        tx.execute(
            sql.as_str(),
            &[
                &complaint.id,
                &complaint.case_number,
                &complaint.reporter_id,
                &complaint.water_body_id,
                &complaint.category.as_str(),
                &complaint.description,
                &complaint.address,
                &complaint.latitude,
                &complaint.longitude,
                &complaint.classification.violation_type.as_str(),
                &complaint.classification.confidence,
                &complaint.classification.urgency.as_str(),
                &complaint.severity_score,
                &complaint.priority.as_str(),
                &complaint.status.as_str(),
                &complaint.assigned_to,
                &complaint.sla_deadline,
                &complaint.resolved_at,
                &complaint.resolution_notes,
                &tier,
                &complaint.escalated_at,
                &complaint.created_at,
                &complaint.updated_at,
            ],
        )
        .await?;
        insert_status_entry(&tx, initial).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_complaint(&self, id: ComplaintId) -> StoreResult<Option<Complaint>> {
        let client = self.client.lock().await;
        let sql = format!("SELECT {} FROM complaints WHERE id = $1", COMPLAINT_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        row.as_ref().map(row_to_complaint).transpose()
    }

    async fn find_by_case_number(&self, case_number: &str) -> StoreResult<Option<Complaint>> {
        let client = self.client.lock().await;
        let sql = format!(
            "SELECT {} FROM complaints WHERE case_number = $1",
            COMPLAINT_COLUMNS
        );
        let row = client.query_opt(sql.as_str(), &[&case_number]).await?;
        row.as_ref().map(row_to_complaint).transpose()
    }

    async fn list_complaints(&self, filter: &ComplaintFilter) -> StoreResult<Vec<Complaint>> {
        let client = self.client.lock().await;
        let sql = format!(
            "SELECT {} FROM complaints \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR priority = $2) \
               AND ($3::uuid IS NULL OR assigned_to = $3) \
               AND ($4::uuid IS NULL OR reporter_id = $4) \
             ORDER BY severity_score DESC, created_at DESC, id \
             LIMIT $5 OFFSET $6",
            COMPLAINT_COLUMNS
        );
        let status = filter.status.map(|s| s.as_str());
        let priority = filter.priority.map(|p| p.as_str());
        let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(filter.offset).unwrap_or(i64::MAX);
        let rows = client
            .query(
                sql.as_str(),
                &[
                    &status,
                    &priority,
                    &filter.assigned_to,
                    &filter.reporter_id,
                    &limit,
                    &offset,
                ],
            )
            .await?;
        rows.iter().map(row_to_complaint).collect()
    }

    async fn open_complaints(&self) -> StoreResult<Vec<Complaint>> {
        let client = self.client.lock().await;
        let sql = format!(
            "SELECT {} FROM complaints WHERE status NOT IN ('resolved', 'rejected') \
             ORDER BY sla_deadline, id",
            COMPLAINT_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[]).await?;
        rows.iter().map(row_to_complaint).collect()
    }

    async fn transition_status(
        &self,
        id: ComplaintId,
        change: &StatusChange,
    ) -> StoreResult<Complaint> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let mut complaint = lock_complaint(&tx, id).await?;
        check_status_change(&complaint, change)?;

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

        tx.execute(
            "UPDATE complaints SET status = $2, assigned_to = $3, resolved_at = $4, \
             resolution_notes = $5, updated_at = $6 WHERE id = $1",
            &[
                &id,
                &complaint.status.as_str(),
                &complaint.assigned_to,
                &complaint.resolved_at,
                &complaint.resolution_notes,
                &complaint.updated_at,
            ],
        )
        .await?;
        insert_status_entry(&tx, &change.log_entry(id)).await?;
        tx.commit().await?;
        Ok(complaint)
    }

    async fn advance_escalation(
        &self,
        id: ComplaintId,
        advance: &EscalationAdvance,
    ) -> StoreResult<Complaint> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let mut complaint = lock_complaint(&tx, id).await?;
        check_escalation(&complaint, advance)?;

        let at = advance.record.at;
        complaint.escalation_tier = Some(advance.record.to_tier);
        complaint.escalated_at = Some(at);
        complaint.updated_at = at;

        if advance.mark_escalated && complaint.status.can_transition_to(ComplaintStatus::Escalated)
        {
            let entry = StatusLogEntry::new(
                id,
                Some(complaint.status),
                ComplaintStatus::Escalated,
                None,
                advance.record.reason.clone(),
                at,
            );
            complaint.status = ComplaintStatus::Escalated;
            insert_status_entry(&tx, &entry).await?;
        }

        tx.execute(
            "UPDATE complaints SET escalation_tier = $2, escalated_at = $3, status = $4, \
             updated_at = $5 WHERE id = $1",
            &[
                &id,
                &advance.record.to_tier.as_str(),
                &complaint.escalated_at,
                &complaint.status.as_str(),
                &complaint.updated_at,
            ],
        )
        .await?;

        let record = &advance.record;
        let from_tier = record.from_tier.map(|t| t.as_str());
        tx.execute(
            "INSERT INTO escalations \
             (id, complaint_id, from_tier, to_tier, from_officer, to_officer, reason, at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            &[
                &record.id,
                &record.complaint_id,
                &from_tier,
                &record.to_tier.as_str(),
                &record.from_officer,
                &record.to_officer,
                &record.reason,
                &record.at,
            ],
        )
        .await?;
        tx.commit().await?;
        Ok(complaint)
    }

    async fn status_log(&self, id: ComplaintId) -> StoreResult<Vec<StatusLogEntry>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT * FROM status_log WHERE complaint_id = $1 ORDER BY at, id",
                &[&id],
            )
            .await?;
        rows.iter().map(row_to_status_entry).collect()
    }

    async fn escalation_history(&self, id: ComplaintId) -> StoreResult<Vec<EscalationRecord>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT * FROM escalations WHERE complaint_id = $1 ORDER BY at, to_tier",
                &[&id],
            )
            .await?;
        rows.iter().map(row_to_escalation).collect()
    }

    async fn dashboard_counts(&self, now: DateTime<Utc>) -> StoreResult<DashboardCounts> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "SELECT COUNT(*), \
                   COUNT(*) FILTER (WHERE status NOT IN ('resolved', 'rejected')), \
                   COUNT(*) FILTER (WHERE status = 'resolved'), \
                   COUNT(*) FILTER (WHERE priority = 'critical'), \
                   COUNT(*) FILTER (WHERE status NOT IN ('resolved', 'rejected') \
                                      AND sla_deadline < $1), \
                   (AVG(EXTRACT(EPOCH FROM (resolved_at - created_at)) / 3600.0) \
                      FILTER (WHERE status = 'resolved' AND resolved_at IS NOT NULL))::float8 \
                 FROM complaints",
                &[&now],
            )
            .await?;
        let at_risk = client
            .query_one(
                "SELECT COUNT(*) FROM water_bodies WHERE risk_level IN ('medium', 'high')",
                &[],
            )
            .await?;
        Ok(DashboardCounts {
            total: count(&row, 0)?,
            active: count(&row, 1)?,
            resolved: count(&row, 2)?,
            critical: count(&row, 3)?,
            overdue: count(&row, 4)?,
            avg_resolution_hours: row.try_get(5)?,
            water_bodies_at_risk: count(&at_risk, 0)?,
        })
    }

    async fn record_notification(&self, notification: &Notification) -> StoreResult<()> {
        let client = self.client.lock().await;
        client
            .execute(
                "INSERT INTO notifications \
                 (id, user_id, complaint_id, subject, message, read, sent_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &notification.id,
                    &notification.user_id,
                    &notification.complaint_id,
                    &notification.subject,
                    &notification.message,
                    &notification.read,
                    &notification.sent_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn notifications_for(&self, user_id: UserId) -> StoreResult<Vec<Notification>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT * FROM notifications WHERE user_id = $1 ORDER BY sent_at, id",
                &[&user_id],
            )
            .await?;
        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_notification_read(&self, user_id: UserId, id: Uuid) -> StoreResult<()> {
        let client = self.client.lock().await;
        let updated = client
            .execute(
                "UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2",
                &[&id, &user_id],
            )
            .await?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> StoreResult<u64> {
        let client = self.client.lock().await;
        Ok(client
            .execute(
                "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read",
                &[&user_id],
            )
            .await?)
    }
}

async fn lock_complaint(
    tx: &tokio_postgres::Transaction<'_>,
    id: ComplaintId,
) -> StoreResult<Complaint> {
    let sql = format!(
        "SELECT {} FROM complaints WHERE id = $1 FOR UPDATE",
        COMPLAINT_COLUMNS
    );
    let row = tx
        .query_opt(sql.as_str(), &[&id])
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("complaint {}", id)))?;
    row_to_complaint(&row)
}

async fn insert_status_entry(
    tx: &tokio_postgres::Transaction<'_>,
    entry: &StatusLogEntry,
) -> StoreResult<()> {
    let from_status = entry.from_status.map(|s| s.as_str());
    tx.execute(
        INSERT_STATUS_LOG,
        &[
            &entry.id,
            &entry.complaint_id,
            &from_status,
            &entry.to_status.as_str(),
            &entry.actor,
            &entry.note,
            &entry.at,
        ],
    )
    .await?;
    Ok(())
}
