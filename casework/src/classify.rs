//! Violation classification adapters
//!
//! The classifier itself is an external model. This module holds the
//! degrade-to-unknown wrapper the pipeline calls, the confidence → urgency
//! rule used when a model reports no urgency, and an HTTP client for a
//! model server.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::external::{ClassifierError, Evidence, ViolationClassifier};
use crate::types::{Classification, Urgency, ViolationType};

/// `confidence × type weight` at or above this is high urgency
pub const HIGH_URGENCY_CUTOFF: f64 = 0.65;
/// `confidence × type weight` at or above this is medium urgency
pub const MEDIUM_URGENCY_CUTOFF: f64 = 0.40;

/// Derive urgency from the classifier's confidence in a violation type.
pub fn urgency_from_confidence(violation: ViolationType, confidence: f64) -> Urgency {
    let score = confidence * violation.urgency_weight();
    if score >= HIGH_URGENCY_CUTOFF {
        Urgency::High
    } else if score >= MEDIUM_URGENCY_CUTOFF {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Classification plus whether it is the fallback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationOutcome {
    pub classification: Classification,
    /// The classifier failed or had nothing to look at
    pub degraded: bool,
}

/// Run the classifier, falling back to [`Classification::unknown`] on any error.
pub async fn classify_or_default(
    classifier: &dyn ViolationClassifier,
    evidence: Option<&Evidence>,
) -> ClassificationOutcome {
    match classifier.classify(evidence).await {
        Ok(classification) => ClassificationOutcome {
            classification,
            degraded: false,
        },
        Err(e) => {
            warn!(error = %e, "Classification degraded to unknown");
            ClassificationOutcome {
                classification: Classification::unknown(),
                degraded: true,
            }
        }
    }
}

/// Classifier for deployments without a model; every report is degraded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClassifier;

#[async_trait]
impl ViolationClassifier for NoClassifier {
    async fn classify(
        &self,
        evidence: Option<&Evidence>,
    ) -> Result<Classification, ClassifierError> {
        match evidence {
            None => Err(ClassifierError::MissingEvidence),
            Some(_) => Err(ClassifierError::Unavailable("no classifier configured".into())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    violation_type: String,
    #[serde(alias = "confidence_score")]
    confidence: f64,
    #[serde(default)]
    urgency: Option<String>,
}

impl ClassifierResponse {
    fn into_classification(self) -> Result<Classification, ClassifierError> {
        if !self.confidence.is_finite() {
            return Err(ClassifierError::InvalidResponse(format!(
                "confidence {} is not a number",
                self.confidence
            )));
        }
        let violation = ViolationType::from_label_lossy(&self.violation_type);
        let urgency = match self.urgency.as_deref() {
            Some(label) => Urgency::from_label_lossy(label),
            None => urgency_from_confidence(violation, self.confidence.clamp(0.0, 1.0)),
        };
        Ok(Classification::new(violation, self.confidence, urgency))
    }
}

/// Posts the evidence image to a model server and parses its JSON verdict
pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ClassifierError::Unavailable(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ViolationClassifier for HttpClassifier {
    async fn classify(
        &self,
        evidence: Option<&Evidence>,
    ) -> Result<Classification, ClassifierError> {
        let evidence = evidence.ok_or(ClassifierError::MissingEvidence)?;

        let resp = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, evidence.content_type.as_str())
            .body(evidence.bytes.clone())
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "non-success status {}",
                resp.status()
            )));
        }
        let parsed: ClassifierResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
        let classification = parsed.into_classification()?;

        info!(
            file = %evidence.file_name,
            violation = %classification.violation_type,
            confidence = classification.confidence,
            urgency = %classification.urgency,
            "Classification result"
        );
        Ok(classification)
    }
}
