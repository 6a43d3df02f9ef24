//! Collaborators consumed by the casework core
//!
//! Each is an async trait object so deployments can plug in a PostGIS
//! lookup, a model server, an SMTP relay, etc. In-process implementations
//! live in [`crate::geo`], [`crate::classify`], [`crate::notify`] and
//! [`crate::assignment`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;
use crate::types::{Classification, Role, User, WaterBodyId};

#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("Boundary lookup unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("No evidence image supplied")]
    MissingEvidence,

    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed classifier response: {0}")]
    InvalidResponse(String),
}

/// Water body found near (not inside) a reported coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearbyBody {
    pub water_body_id: WaterBodyId,
    pub distance_m: f64,
}

/// Evidence image attached to a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Maps coordinates onto registered water bodies
#[async_trait]
pub trait BoundaryLookup: Send + Sync {
    /// Water body whose boundary contains the point, if any.
    async fn containing_body(&self, lat: f64, lon: f64)
        -> Result<Option<WaterBodyId>, BoundaryError>;

    /// Closest water body whose boundary lies within `radius_m` metres.
    async fn nearest_body(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Option<NearbyBody>, BoundaryError>;
}

/// Detects the violation shown in a report's evidence
#[async_trait]
pub trait ViolationClassifier: Send + Sync {
    async fn classify(&self, evidence: Option<&Evidence>)
        -> Result<Classification, ClassifierError>;
}

/// Delivers a message to a user. Best effort: `false` means not delivered.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user: &User, subject: &str, message: &str) -> bool;
}

/// Staff lookups used by assignment and escalation routing
#[async_trait]
pub trait Directory: Send + Sync {
    /// Active user with `role` holding the fewest open complaints.
    async fn find_least_loaded(&self, role: Role) -> Result<Option<User>, StoreError>;

    /// Any active user with `role`, chosen deterministically.
    async fn find_any_active(&self, role: Role) -> Result<Option<User>, StoreError>;
}
