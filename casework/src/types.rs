//! Core domain types for complaint casework
//!
//! Plain value types shared by every module. They are persisted by the
//! repository implementations in [`crate::store`]; enums round-trip through
//! their snake_case labels (`as_str` / `FromStr`) so they can be stored as text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::status::ComplaintStatus;

/// Unique identifier for complaints
pub type ComplaintId = Uuid;

/// Unique identifier for users (reporters and staff)
pub type UserId = Uuid;

/// Unique identifier for registered water bodies
pub type WaterBodyId = Uuid;

/// Error returned when a stored or user-supplied label does not name a variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} label: {value}")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseLabelError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Water bodies
// ============================================================================

/// Kind of water body. Also used as the reporter-selected complaint category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterBodyKind {
    Lake,
    River,
    Canal,
}

impl WaterBodyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lake => "lake",
            Self::River => "river",
            Self::Canal => "canal",
        }
    }
}

impl fmt::Display for WaterBodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaterBodyKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lake" => Ok(Self::Lake),
            "river" => Ok(Self::River),
            "canal" => Ok(Self::Canal),
            other => Err(ParseLabelError::new("water body kind", other)),
        }
    }
}

/// Zone-level risk tier of a water body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ParseLabelError::new("risk level", other)),
        }
    }
}

/// A registered water body.
///
/// Only the risk fields change after registration, and only through
/// [`crate::reporting::RiskRecalculator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterBody {
    pub id: WaterBodyId,
    pub name: String,
    pub kind: WaterBodyKind,
    /// Ecological sensitivity, 0–100
    pub sensitivity_score: i32,
    /// Last computed risk score, 0–100
    pub risk_score: i32,
    pub risk_level: RiskLevel,
    pub risk_updated_at: Option<DateTime<Utc>>,
}

impl WaterBody {
    /// Register a new water body with no risk history yet.
    pub fn new(name: impl Into<String>, kind: WaterBodyKind, sensitivity_score: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            sensitivity_score,
            risk_score: 0,
            risk_level: RiskLevel::Low,
            risk_updated_at: None,
        }
    }
}

/// One row of a water body's risk history, appended on every recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskHistoryEntry {
    pub id: Uuid,
    pub water_body_id: WaterBodyId,
    pub risk_score: i32,
    pub risk_level: RiskLevel,
    pub complaint_density_score: i32,
    pub construction_score: i32,
    pub urban_growth_score: i32,
    pub shrinkage_score: i32,
    pub calculated_at: DateTime<Utc>,
}

// ============================================================================
// Users
// ============================================================================

/// Role of a user of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Member of the public filing reports
    Citizen,
    /// Caseworker handling assigned complaints
    Officer,
    /// Receives level-2 escalations
    Supervisor,
    /// Receives level-3 escalations
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Officer => "officer",
            Self::Supervisor => "supervisor",
            Self::Admin => "admin",
        }
    }

    /// Whether this role may change the status of a complaint.
    pub fn can_update_status(&self) -> bool {
        matches!(self, Self::Officer | Self::Supervisor | Self::Admin)
    }

    /// Roles that may carry a caseload.
    pub fn can_hold_cases(&self) -> bool {
        matches!(self, Self::Officer | Self::Supervisor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" => Ok(Self::Citizen),
            "officer" => Ok(Self::Officer),
            "supervisor" => Ok(Self::Supervisor),
            "admin" => Ok(Self::Admin),
            other => Err(ParseLabelError::new("role", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

impl User {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            email: email.into(),
            role,
            active: true,
        }
    }
}

/// A staff member together with the number of open complaints assigned to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffWorkload {
    pub user: User,
    pub open_cases: usize,
}

// ============================================================================
// Classification
// ============================================================================

/// Violation detected in a report's evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    Construction,
    LandFilling,
    Pollution,
    DebrisDumping,
    Unknown,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::LandFilling => "land_filling",
            Self::Pollution => "pollution",
            Self::DebrisDumping => "debris_dumping",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a classifier label; anything unrecognised is `Unknown`.
    pub fn from_label_lossy(label: &str) -> Self {
        label.parse().unwrap_or(Self::Unknown)
    }

    /// Base severity of the violation itself (0–100).
    pub fn base_score(&self) -> f64 {
        match self {
            Self::Construction => 95.0,
            Self::LandFilling => 85.0,
            Self::Pollution => 80.0,
            Self::DebrisDumping => 60.0,
            Self::Unknown => 30.0,
        }
    }

    /// Environmental impact of the violation (0–100).
    pub fn environmental_impact(&self) -> f64 {
        match self {
            Self::Construction => 90.0,
            Self::LandFilling => 85.0,
            Self::Pollution => 95.0,
            Self::DebrisDumping => 55.0,
            Self::Unknown => 30.0,
        }
    }

    /// Weight applied to classifier confidence when deriving urgency.
    pub fn urgency_weight(&self) -> f64 {
        match self {
            Self::Construction => 0.9,
            Self::Pollution => 0.8,
            Self::LandFilling => 0.7,
            Self::DebrisDumping | Self::Unknown => 0.5,
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViolationType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "construction" => Ok(Self::Construction),
            "land_filling" => Ok(Self::LandFilling),
            "pollution" => Ok(Self::Pollution),
            "debris_dumping" => Ok(Self::DebrisDumping),
            "unknown" => Ok(Self::Unknown),
            other => Err(ParseLabelError::new("violation type", other)),
        }
    }
}

/// Urgency tier reported by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse a classifier label; anything unrecognised scores as `Low`.
    pub fn from_label_lossy(label: &str) -> Self {
        label.parse().unwrap_or(Self::Low)
    }

    /// Severity contribution of the urgency tier (0–100).
    pub fn score(&self) -> f64 {
        match self {
            Self::High => 100.0,
            Self::Medium => 60.0,
            Self::Low => 25.0,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ParseLabelError::new("urgency", other)),
        }
    }
}

/// Output of the violation classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub violation_type: ViolationType,
    /// Confidence in `violation_type`, 0.0–1.0
    pub confidence: f64,
    pub urgency: Urgency,
}

impl Classification {
    pub fn new(violation_type: ViolationType, confidence: f64, urgency: Urgency) -> Self {
        Self {
            violation_type,
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            urgency,
        }
    }

    /// Lowest-confidence classification, used whenever the classifier cannot answer.
    pub fn unknown() -> Self {
        Self {
            violation_type: ViolationType::Unknown,
            confidence: 0.0,
            urgency: Urgency::Low,
        }
    }
}

// ============================================================================
// Priority and escalation
// ============================================================================

/// Priority tier derived from the severity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "critical" => Ok(Self::Critical),
            other => Err(ParseLabelError::new("priority", other)),
        }
    }
}

/// Escalation tiers, in ascending order.
///
/// `None < Some(Level1) < Some(Level2) < Some(Level3)` under `Option`'s
/// ordering, which is what the monotonicity checks rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    /// Warning to the assigned caseworker
    Level1,
    /// Supervisor escalation, status becomes `escalated`
    Level2,
    /// Admin escalation
    Level3,
}

impl EscalationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Level1 => "level_1",
            Self::Level2 => "level_2",
            Self::Level3 => "level_3",
        }
    }

    /// Human-readable label used in notifications.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Level1 => "Level 1 - Warning",
            Self::Level2 => "Level 2 - Supervisor",
            Self::Level3 => "Level 3 - Admin Escalation",
        }
    }
}

impl fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscalationTier {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level_1" => Ok(Self::Level1),
            "level_2" => Ok(Self::Level2),
            "level_3" => Ok(Self::Level3),
            other => Err(ParseLabelError::new("escalation tier", other)),
        }
    }
}

// ============================================================================
// Complaint and audit records
// ============================================================================

/// The central casework entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: ComplaintId,
    /// Human-readable case number, e.g. `AQS-20240501-00007`
    pub case_number: String,
    pub reporter_id: UserId,
    pub water_body_id: Option<WaterBodyId>,
    pub category: WaterBodyKind,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,

    pub classification: Classification,
    pub severity_score: i32,
    pub priority: Priority,

    pub status: ComplaintStatus,
    pub assigned_to: Option<UserId>,
    /// Fixed at creation; never recomputed
    pub sla_deadline: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,

    pub escalation_tier: Option<EscalationTier>,
    pub escalated_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    /// Whether the complaint is closed (resolved or rejected).
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the SLA deadline has passed at `now` on an open complaint.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminal() && self.sla_deadline < now
    }
}

/// Append-only record of a status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLogEntry {
    pub id: Uuid,
    pub complaint_id: ComplaintId,
    pub from_status: Option<ComplaintStatus>,
    pub to_status: ComplaintStatus,
    /// `None` for system-generated transitions
    pub actor: Option<UserId>,
    pub note: String,
    pub at: DateTime<Utc>,
}

impl StatusLogEntry {
    pub fn new(
        complaint_id: ComplaintId,
        from_status: Option<ComplaintStatus>,
        to_status: ComplaintStatus,
        actor: Option<UserId>,
        note: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            complaint_id,
            from_status,
            to_status,
            actor,
            note: note.into(),
            at,
        }
    }
}

/// Append-only record of an escalation tier transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub id: Uuid,
    pub complaint_id: ComplaintId,
    pub from_tier: Option<EscalationTier>,
    pub to_tier: EscalationTier,
    /// Caseworker holding the complaint when it escalated
    pub from_officer: Option<UserId>,
    /// Staff member the escalation was routed to, if one was found
    pub to_officer: Option<UserId>,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// In-app notification, persisted before delivery is attempted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: UserId,
    pub complaint_id: Option<ComplaintId>,
    pub subject: String,
    pub message: String,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}
