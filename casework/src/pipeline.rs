//! Complaint intake pipeline
//!
//! Turns one citizen report into a scored, deadline-bound, assigned case:
//!
//! 1. geo-validate (containing water body, else nearest within the radius)
//! 2. classify the evidence, degrading to `unknown` on failure
//! 3. score severity against the water body and its recent complaint density
//! 4. fix the SLA deadline
//! 5. allocate a case number from the per-day sequence
//! 6. persist at `ai_processed` with the first status log entry
//! 7. assign the least-loaded officer, if any
//! 8. notify the reporter
//!
//! Only step 1 can reject a report. Steps 2 and 7 degrade; notification
//! failures never undo what was persisted.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::classify_or_default;
use crate::config::EngineConfig;
use crate::external::{BoundaryError, BoundaryLookup, Directory, Evidence, ViolationClassifier};
use crate::notify::{Message, Notifier};
use crate::scoring::{
    complaints_per_day, score_severity, shift_days, SeverityAssessment, SeverityInput,
};
use crate::status::ComplaintStatus;
use crate::store::{SharedRepository, StatusChange, StoreError};
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fallback search radius when no boundary contains the point
    pub nearby_radius_m: f64,
    /// Trailing window for the complaint density figure
    pub density_window_days: i64,
    pub case_prefix: String,
    /// Case-number collisions tolerated before giving up
    pub allocation_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            nearby_radius_m: 500.0,
            density_window_days: 90,
            case_prefix: "AQS".to_string(),
            allocation_retries: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Location ({latitude}, {longitude}) is not within or near any registered water body")]
    NoApplicableWaterBody { latitude: f64, longitude: f64 },

    #[error("Unknown reporter: {0}")]
    UnknownReporter(UserId),

    #[error("Invalid coordinates: ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("SLA deadline falls outside the representable date range")]
    DeadlineOutOfRange,

    #[error("Could not allocate a unique case number after {0} attempts")]
    CaseNumberExhausted(u32),

    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Whether this is a rejection of the report itself rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NoApplicableWaterBody { .. }
                | Self::UnknownReporter(_)
                | Self::InvalidCoordinates { .. }
        )
    }
}

/// A citizen report as received from the boundary layer
#[derive(Debug, Clone)]
pub struct ComplaintReport {
    pub reporter_id: UserId,
    pub category: WaterBodyKind,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub address: Option<String>,
    pub evidence: Option<Evidence>,
}

/// How the report was matched to its water body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum WaterBodyMatch {
    Contained,
    Nearby { distance_m: f64 },
}

/// Result of one accepted submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub complaint: Complaint,
    pub severity: SeverityAssessment,
    pub matched: WaterBodyMatch,
    pub classification_degraded: bool,
    pub assigned_to: Option<UserId>,
    pub reporter_notified: bool,
}

/// `PREFIX-YYYYMMDD-NNNNN`
pub fn format_case_number(prefix: &str, day: NaiveDate, sequence: u64) -> String {
    format!("{}-{}-{:05}", prefix, day.format("%Y%m%d"), sequence)
}

pub struct ComplaintPipeline {
    repo: SharedRepository,
    boundaries: Arc<dyn BoundaryLookup>,
    classifier: Arc<dyn ViolationClassifier>,
    directory: Arc<dyn Directory>,
    notifier: Notifier,
    config: Arc<EngineConfig>,
}

impl ComplaintPipeline {
    pub fn new(
        repo: SharedRepository,
        boundaries: Arc<dyn BoundaryLookup>,
        classifier: Arc<dyn ViolationClassifier>,
        directory: Arc<dyn Directory>,
        notifier: Notifier,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            repo,
            boundaries,
            classifier,
            directory,
            notifier,
            config,
        }
    }

    pub async fn submit(&self, report: ComplaintReport) -> Result<SubmissionOutcome, PipelineError> {
        self.submit_at(report, Utc::now()).await
    }

    /// Run the full pipeline for `report` as of `now`.
    pub async fn submit_at(
        &self,
        report: ComplaintReport,
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome, PipelineError> {
        let (lat, lon) = (report.latitude, report.longitude);
        if !(lat.is_finite() && lon.is_finite())
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lon)
        {
            return Err(PipelineError::InvalidCoordinates {
                latitude: lat,
                longitude: lon,
            });
        }

        let reporter = self
            .repo
            .get_user(report.reporter_id)
            .await?
            .ok_or(PipelineError::UnknownReporter(report.reporter_id))?;

        // Geo-validate
        let (water_body_id, matched) = self.locate(lat, lon).await?;
        let water_body = self
            .repo
            .get_water_body(water_body_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("water body {}", water_body_id)))?;

        // Classify
        let classified = classify_or_default(self.classifier.as_ref(), report.evidence.as_ref()).await;
        let classification = classified.classification;

        // Score
        let density = self.complaint_density(water_body_id, now).await?;
        let severity = score_severity(
            &SeverityInput {
                violation_type: classification.violation_type,
                urgency: classification.urgency,
                location_sensitivity: water_body.sensitivity_score,
                complaint_density: density,
                water_body_kind: water_body.kind,
            },
            &self.config.severity,
        );
        let sla_deadline = self
            .config
            .sla
            .deadline(severity.priority, now)
            .ok_or(PipelineError::DeadlineOutOfRange)?;

        // Allocate and persist
        let mut complaint = Complaint {
            id: Uuid::new_v4(),
            case_number: String::new(),
            reporter_id: reporter.id,
            water_body_id: Some(water_body_id),
            category: report.category,
            description: report.description,
            address: report.address,
            latitude: lat,
            longitude: lon,
            classification,
            severity_score: severity.score,
            priority: severity.priority,
            status: ComplaintStatus::AiProcessed,
            assigned_to: None,
            sla_deadline,
            resolved_at: None,
            resolution_notes: None,
            escalation_tier: None,
            escalated_at: None,
            created_at: now,
            updated_at: now,
        };
        self.persist_new(&mut complaint, &reporter, now).await?;

        info!(
            case = %complaint.case_number,
            water_body = %water_body.name,
            violation = %classification.violation_type,
            severity = severity.score,
            priority = %severity.priority,
            deadline = %complaint.sla_deadline,
            "Complaint created"
        );

        // Assign
        let assigned_to = match self.assign(&mut complaint, now).await {
            Some(officer) => {
                self.notifier
                    .send(&officer, Some(&complaint), &Message::assigned(&complaint), now)
                    .await;
                Some(officer.id)
            }
            None => None,
        };

        // Notify reporter
        let reporter_notified = self
            .notifier
            .send(
                &reporter,
                Some(&complaint),
                &Message::submitted(&complaint.case_number),
                now,
            )
            .await;

        Ok(SubmissionOutcome {
            complaint,
            severity,
            matched,
            classification_degraded: classified.degraded,
            assigned_to,
            reporter_notified,
        })
    }

    async fn locate(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<(WaterBodyId, WaterBodyMatch), PipelineError> {
        if let Some(id) = self.boundaries.containing_body(lat, lon).await? {
            return Ok((id, WaterBodyMatch::Contained));
        }
        let radius = self.config.pipeline.nearby_radius_m;
        if let Some(near) = self.boundaries.nearest_body(lat, lon, radius).await? {
            debug!(distance_m = near.distance_m, "Matched nearby water body");
            return Ok((
                near.water_body_id,
                WaterBodyMatch::Nearby {
                    distance_m: near.distance_m,
                },
            ));
        }
        info!(lat, lon, radius_m = radius, "Report rejected: no applicable water body");
        Err(PipelineError::NoApplicableWaterBody {
            latitude: lat,
            longitude: lon,
        })
    }

    /// Complaints per day at the water body over the trailing window.
    async fn complaint_density(
        &self,
        water_body_id: WaterBodyId,
        now: DateTime<Utc>,
    ) -> Result<f64, StoreError> {
        // A window reaching past the calendar covers all history.
        let since = shift_days(now, -self.config.pipeline.density_window_days)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let window = self.repo.complaint_window(water_body_id, since).await?;
        let span_days = window
            .earliest
            .map(|earliest| (now - earliest).num_seconds() as f64 / 86_400.0)
            .unwrap_or(0.0);
        Ok(complaints_per_day(window.count, span_days))
    }

    /// Allocate a case number and insert, retrying on number collisions.
    async fn persist_new(
        &self,
        complaint: &mut Complaint,
        reporter: &User,
        now: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let day = now.date_naive();
        let attempts = self.config.pipeline.allocation_retries.max(1);
        let initial = StatusLogEntry::new(
            complaint.id,
            None,
            ComplaintStatus::AiProcessed,
            Some(reporter.id),
            format!(
                "Complaint submitted and AI processed. Violation: {}, Severity: {}",
                complaint.classification.violation_type, complaint.severity_score
            ),
            now,
        );

        for attempt in 1..=attempts {
            let sequence = self.repo.next_case_sequence(day).await?;
            complaint.case_number =
                format_case_number(&self.config.pipeline.case_prefix, day, sequence);
            match self.repo.insert_complaint(complaint, &initial).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_conflict() => {
                    warn!(
                        case = %complaint.case_number,
                        attempt,
                        "Case number collision, allocating another"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PipelineError::CaseNumberExhausted(attempts))
    }

    /// Assign the least-loaded officer. Any shortfall leaves the complaint unassigned.
    async fn assign(&self, complaint: &mut Complaint, now: DateTime<Utc>) -> Option<User> {
        let officer = match self.directory.find_least_loaded(Role::Officer).await {
            Ok(Some(officer)) => officer,
            Ok(None) => {
                info!(case = %complaint.case_number, "No officer available, left unassigned");
                return None;
            }
            Err(e) => {
                warn!(case = %complaint.case_number, error = %e, "Officer lookup failed, left unassigned");
                return None;
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
                *complaint = updated;
                Some(officer)
            }
            Err(e) => {
                warn!(case = %complaint.case_number, error = %e, "Assignment not recorded");
                None
            }
        }
    }
}
