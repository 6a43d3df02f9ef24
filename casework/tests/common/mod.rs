//! Shared fixtures for the casework integration tests: an in-memory store,
//! a one-lake boundary registry, scripted classifiers and a recording sink.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use casework::assignment::StoreDirectory;
use casework::external::{
    ClassifierError, Directory, Evidence, NotificationSink, ViolationClassifier,
};
use casework::geo::{GeoPoint, Polygon, PolygonBoundaries};
use casework::notify::{Notifier, NotifyConfig};
use casework::reporting::RiskRecalculator;
use casework::types::{StatusLogEntry, Urgency, UserId};
use casework::*;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

pub const INSIDE_LAKE_A: (f64, f64) = (12.91, 77.51);
/// About 330 m north of the Lake A boundary
pub const NEAR_LAKE_A: (f64, f64) = (12.923, 77.51);
pub const FAR_AWAY: (f64, f64) = (13.50, 78.20);

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

/// Classifier returning a fixed answer, or failing
pub struct ScriptedClassifier {
    pub answer: Option<Classification>,
}

impl ScriptedClassifier {
    pub fn construction_high() -> Self {
        Self {
            answer: Some(Classification::new(
                ViolationType::Construction,
                0.9,
                Urgency::High,
            )),
        }
    }

    pub fn failing() -> Self {
        Self { answer: None }
    }
}

#[async_trait]
impl ViolationClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        _evidence: Option<&Evidence>,
    ) -> Result<Classification, ClassifierError> {
        self.answer
            .ok_or_else(|| ClassifierError::Unavailable("model server down".into()))
    }
}

/// Sink that records every attempt and can be told to refuse delivery
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(UserId, String)>>,
    pub refuse: std::sync::atomic::AtomicBool,
}

impl RecordingSink {
    pub fn subjects_for(&self, user: UserId) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user)
            .map(|(_, s)| s.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, user: &User, subject: &str, _message: &str) -> bool {
        if self.refuse.load(std::sync::atomic::Ordering::SeqCst) {
            return false;
        }
        self.delivered
            .lock()
            .unwrap()
            .push((user.id, subject.to_string()));
        true
    }
}

/// A populated engine around one lake
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub repo: SharedRepository,
    pub boundaries: Arc<PolygonBoundaries>,
    pub sink: Arc<RecordingSink>,
    pub config: Arc<EngineConfig>,
    pub lake: WaterBody,
    pub citizen: User,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let repo: SharedRepository = store.clone();

        let mut lake = WaterBody::new("Lake A", WaterBodyKind::Lake, 60);
        lake.id = Uuid::from_u128(0xA);
        repo.put_water_body(&lake).await.unwrap();

        let boundaries = Arc::new(PolygonBoundaries::new());
        boundaries
            .register(
                lake.id,
                Polygon::new(vec![
                    GeoPoint::new(12.90, 77.50),
                    GeoPoint::new(12.90, 77.52),
                    GeoPoint::new(12.92, 77.52),
                    GeoPoint::new(12.92, 77.50),
                ]),
            )
            .unwrap();

        let citizen = User::new("Mira Citizen", "mira@example.org", Role::Citizen);
        repo.put_user(&citizen).await.unwrap();

        Self {
            store,
            repo,
            boundaries,
            sink: Arc::new(RecordingSink::default()),
            config: Arc::new(EngineConfig::default()),
            lake,
            citizen,
        }
    }

    pub async fn add_staff(&self, name: &str, role: Role) -> User {
        let user = User::new(name, format!("{}@example.org", name.to_lowercase()), role);
        self.repo.put_user(&user).await.unwrap();
        user
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(
            self.repo.clone(),
            self.sink.clone(),
            NotifyConfig {
                attempts: 2,
                backoff_ms: 0,
            },
        )
    }

    pub fn directory(&self) -> Arc<dyn Directory> {
        Arc::new(StoreDirectory::new(self.repo.clone()))
    }

    pub fn pipeline(&self, classifier: ScriptedClassifier) -> ComplaintPipeline {
        ComplaintPipeline::new(
            self.repo.clone(),
            self.boundaries.clone(),
            Arc::new(classifier),
            self.directory(),
            self.notifier(),
            self.config.clone(),
        )
    }

    pub fn sweeper(&self) -> EscalationSweeper {
        EscalationSweeper::new(
            self.repo.clone(),
            self.directory(),
            self.notifier(),
            EscalationEngine::with_config(self.config.escalation.clone()),
        )
    }

    pub fn cases(&self) -> CaseService {
        CaseService::new(self.repo.clone(), self.directory(), self.notifier())
    }

    pub fn risk(&self) -> RiskRecalculator {
        RiskRecalculator::new(self.repo.clone(), self.config.risk.clone())
    }

    pub fn report_at(&self, (lat, lon): (f64, f64)) -> ComplaintReport {
        ComplaintReport {
            reporter_id: self.citizen.id,
            category: WaterBodyKind::Lake,
            latitude: lat,
            longitude: lon,
            description: Some("Fresh earth dumped along the shore".into()),
            address: None,
            evidence: Some(Evidence {
                file_name: "shore.jpg".into(),
                content_type: "image/jpeg".into(),
                bytes: vec![0xFF, 0xD8, 0xFF],
            }),
        }
    }

    /// Insert a complaint directly, bypassing the pipeline.
    pub async fn open_case(
        &self,
        deadline: DateTime<Utc>,
        status: ComplaintStatus,
        tier: Option<EscalationTier>,
        assigned_to: Option<UserId>,
    ) -> Complaint {
        let created_at = deadline - Duration::days(3);
        let id = Uuid::new_v4();
        let sequence = self.repo.next_case_sequence(created_at.date_naive()).await.unwrap();
        let complaint = Complaint {
            id,
            case_number: pipeline::format_case_number("AQS", created_at.date_naive(), sequence),
            reporter_id: self.citizen.id,
            water_body_id: Some(self.lake.id),
            category: WaterBodyKind::Lake,
            description: None,
            address: None,
            latitude: INSIDE_LAKE_A.0,
            longitude: INSIDE_LAKE_A.1,
            classification: Classification::new(ViolationType::Construction, 0.9, Urgency::High),
            severity_score: 76,
            priority: Priority::Critical,
            status,
            assigned_to,
            sla_deadline: deadline,
            resolved_at: None,
            resolution_notes: None,
            escalation_tier: tier,
            escalated_at: None,
            created_at,
            updated_at: created_at,
        };
        let initial = StatusLogEntry::new(id, None, status, None, "seeded", created_at);
        self.repo.insert_complaint(&complaint, &initial).await.unwrap();
        complaint
    }
}
