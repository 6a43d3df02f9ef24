//! Complaint lifecycle and SLA escalation engine for water-body monitoring
//!
//! This library provides:
//! - Deterministic severity and zone-risk scoring, and the SLA policy
//! - A complaint intake pipeline: geo-validation, classification, scoring,
//!   case numbering, assignment and notification
//! - A case lifecycle service for staff status updates and queries
//! - An idempotent escalation sweeper over open complaints
//! - Risk recomputation and dashboard reporting
//!
//! # Collaborators
//!
//! Boundary lookup, violation classification, notification delivery and the
//! staff directory are traits in [`external`]; storage is the
//! [`store::Repository`] trait. In-process implementations ship with the
//! crate ([`geo::PolygonBoundaries`], [`classify::HttpClassifier`],
//! [`notify::TracingSink`], [`assignment::StoreDirectory`],
//! [`store::MemoryStore`]); the `postgres` feature adds `store::PgStore`.
//!
//! # Time
//!
//! Every time-dependent operation has an `*_at(now)` variant so callers and
//! tests control the clock.

#![allow(clippy::uninlined_format_args)]

pub mod assignment;
pub mod classify;
pub mod config;
pub mod escalation;
pub mod external;
pub mod geo;
pub mod lifecycle;
pub mod notify;
pub mod pipeline;
pub mod reporting;
pub mod scoring;
pub mod status;
pub mod store;
pub mod types;

// Re-export key types
pub use config::{ConfigError, EngineConfig};
pub use escalation::{EscalationEngine, EscalationSweeper, SweepSummary};
pub use lifecycle::{CaseService, LifecycleError, StatusUpdate};
pub use pipeline::{ComplaintPipeline, ComplaintReport, PipelineError, SubmissionOutcome};
pub use status::ComplaintStatus;
pub use store::{MemoryStore, Repository, SharedRepository, StoreError, StoreResult};
pub use types::{
    Classification, Complaint, EscalationTier, Priority, Role, User, ViolationType, WaterBody,
    WaterBodyKind,
};
