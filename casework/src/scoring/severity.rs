//! Environmental Severity Index
//!
//! Scores a single complaint from its classification and location context:
//!
//! | Component              | Default weight | Source                          |
//! |------------------------|----------------|---------------------------------|
//! | Violation type         | 0.40           | fixed per-type base score       |
//! | Urgency                | 0.20           | classifier urgency tier         |
//! | Location sensitivity   | 0.15           | water body sensitivity, clamped |
//! | Complaint density      | 0.15           | complaints/day × 10, capped     |
//! | Environmental impact   | 0.10           | fixed per-type impact score     |
//!
//! The weighted sum is multiplied by a water-body-kind factor, floored and
//! clamped to 0–100. Pure: no I/O, no clock, no global state.

use serde::{Deserialize, Serialize};

use crate::types::{Priority, Urgency, ViolationType, WaterBodyKind};

/// Absorbs binary floating point error before flooring (e.g. 69.99999999 → 70).
const FLOOR_EPSILON: f64 = 1e-9;

/// Component weights. Must sum to 1.0 (checked by [`crate::config::EngineConfig::validate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub violation_type: f64,
    pub urgency: f64,
    pub location_sensitivity: f64,
    pub complaint_density: f64,
    pub environmental_impact: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            violation_type: 0.40,
            urgency: 0.20,
            location_sensitivity: 0.15,
            complaint_density: 0.15,
            environmental_impact: 0.10,
        }
    }
}

impl SeverityWeights {
    pub fn total(&self) -> f64 {
        self.violation_type
            + self.urgency
            + self.location_sensitivity
            + self.complaint_density
            + self.environmental_impact
    }
}

/// Multiplier applied per water body kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterBodyMultipliers {
    pub lake: f64,
    pub river: f64,
    pub canal: f64,
}

impl Default for WaterBodyMultipliers {
    fn default() -> Self {
        Self {
            lake: 1.0,
            river: 1.1,
            canal: 0.85,
        }
    }
}

impl WaterBodyMultipliers {
    pub fn for_kind(&self, kind: WaterBodyKind) -> f64 {
        match kind {
            WaterBodyKind::Lake => self.lake,
            WaterBodyKind::River => self.river,
            WaterBodyKind::Canal => self.canal,
        }
    }
}

/// Configuration for the severity scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub weights: SeverityWeights,
    pub multipliers: WaterBodyMultipliers,
    /// Complaints/day are multiplied by this before capping at 100
    pub density_scale: f64,
    /// Scores at or above this are critical
    pub critical_threshold: i32,
    /// Scores at or above this (and below critical) are medium
    pub medium_threshold: i32,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            weights: SeverityWeights::default(),
            multipliers: WaterBodyMultipliers::default(),
            density_scale: 10.0,
            critical_threshold: 70,
            medium_threshold: 40,
        }
    }
}

impl SeverityConfig {
    /// Map a score to its priority tier.
    pub fn priority_for(&self, score: i32) -> Priority {
        if score >= self.critical_threshold {
            Priority::Critical
        } else if score >= self.medium_threshold {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// Inputs to one severity computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityInput {
    pub violation_type: ViolationType,
    pub urgency: Urgency,
    /// Water body sensitivity; clamped to 0–100
    pub location_sensitivity: i32,
    /// Complaints per day at the water body over the trailing window
    pub complaint_density: f64,
    pub water_body_kind: WaterBodyKind,
}

/// Weighted contribution of every component, kept for audit and tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    pub violation_component: f64,
    pub urgency_component: f64,
    pub sensitivity_component: f64,
    pub density_component: f64,
    pub impact_component: f64,
    pub water_body_multiplier: f64,
    /// Weighted sum before the multiplier
    pub raw_score: f64,
    pub final_score: i32,
}

/// Result of the severity scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    pub score: i32,
    pub priority: Priority,
    pub breakdown: SeverityBreakdown,
}

/// Normalise complaints/day onto 0–100.
pub fn normalize_density(density: f64, scale: f64) -> f64 {
    if !density.is_finite() || density <= 0.0 {
        return 0.0;
    }
    (density * scale).min(100.0)
}

/// Compute the Environmental Severity Index for one complaint.
pub fn score_severity(input: &SeverityInput, config: &SeverityConfig) -> SeverityAssessment {
    let w = &config.weights;

    let violation_component = input.violation_type.base_score() * w.violation_type;
    let urgency_component = input.urgency.score() * w.urgency;
    let sensitivity_component =
        f64::from(input.location_sensitivity.clamp(0, 100)) * w.location_sensitivity;
    let density_component =
        normalize_density(input.complaint_density, config.density_scale) * w.complaint_density;
    let impact_component = input.violation_type.environmental_impact() * w.environmental_impact;

    let raw_score = violation_component
        + urgency_component
        + sensitivity_component
        + density_component
        + impact_component;

    let multiplier = config.multipliers.for_kind(input.water_body_kind);
    let final_score = ((raw_score * multiplier + FLOOR_EPSILON).floor() as i32).clamp(0, 100);
    let priority = config.priority_for(final_score);

    tracing::debug!(
        violation = %input.violation_type,
        urgency = %input.urgency,
        score = final_score,
        priority = %priority,
        "Severity computed"
    );

    SeverityAssessment {
        score: final_score,
        priority,
        breakdown: SeverityBreakdown {
            violation_component,
            urgency_component,
            sensitivity_component,
            density_component,
            impact_component,
            water_body_multiplier: multiplier,
            raw_score,
            final_score,
        },
    }
}
