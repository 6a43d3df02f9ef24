//! Water-body risk scoring
//!
//! Zone-level risk from a water body's complaint history. Independent of the
//! per-complaint flow: it never reads or changes a complaint.
//!
//! ```text
//! complaint density      min(total × 5, 100)            × 0.30
//! construction activity  min(construction × 15, 100)    × 0.25
//! urban growth (proxy)   min(recent_30d × 10, 100)      × 0.25
//! shrinkage (proxy)      min(critical / total × 100, 100) × 0.20
//! ```

use serde::{Deserialize, Serialize};

use crate::types::RiskLevel;

/// Sub-score weights. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub complaint_density: f64,
    pub construction_activity: f64,
    pub urban_growth: f64,
    pub shrinkage: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            complaint_density: 0.30,
            construction_activity: 0.25,
            urban_growth: 0.25,
            shrinkage: 0.20,
        }
    }
}

impl RiskWeights {
    pub fn total(&self) -> f64 {
        self.complaint_density + self.construction_activity + self.urban_growth + self.shrinkage
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub weights: RiskWeights,
    /// Points per complaint on record
    pub per_complaint: i64,
    /// Points per construction-type complaint
    pub per_construction: i64,
    /// Points per complaint inside the recent window
    pub per_recent: i64,
    /// Width of the recent-activity window, in days
    pub recent_window_days: i64,
    pub high_threshold: i32,
    pub medium_threshold: i32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            per_complaint: 5,
            per_construction: 15,
            per_recent: 10,
            recent_window_days: 30,
            high_threshold: 70,
            medium_threshold: 40,
        }
    }
}

impl RiskConfig {
    pub fn level_for(&self, score: i32) -> RiskLevel {
        if score >= self.high_threshold {
            RiskLevel::High
        } else if score >= self.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Aggregated complaint statistics for one water body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintHistory {
    pub total: u64,
    pub construction: u64,
    pub critical: u64,
    pub recent: u64,
}

/// Sub-scores and result of one risk computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub complaint_density_score: i32,
    pub construction_score: i32,
    pub urban_growth_score: i32,
    pub shrinkage_score: i32,
    pub risk_score: i32,
    pub risk_level: RiskLevel,
}

fn capped(count: u64, factor: i64) -> i32 {
    let points = (count as i64).saturating_mul(factor);
    points.clamp(0, 100) as i32
}

/// Compute the risk score for one water body's history.
pub fn score_risk(history: &ComplaintHistory, config: &RiskConfig) -> RiskScore {
    let complaint_density_score = capped(history.total, config.per_complaint);
    let construction_score = capped(history.construction, config.per_construction);
    let urban_growth_score = capped(history.recent, config.per_recent);
    let shrinkage_score = if history.total > 0 {
        ((history.critical as f64 / history.total as f64) * 100.0)
            .floor()
            .clamp(0.0, 100.0) as i32
    } else {
        0
    };

    let w = &config.weights;
    let weighted = f64::from(complaint_density_score) * w.complaint_density
        + f64::from(construction_score) * w.construction_activity
        + f64::from(urban_growth_score) * w.urban_growth
        + f64::from(shrinkage_score) * w.shrinkage;

    let risk_score = ((weighted + 1e-9).floor() as i32).clamp(0, 100);

    RiskScore {
        complaint_density_score,
        construction_score,
        urban_growth_score,
        shrinkage_score,
        risk_score,
        risk_level: config.level_for(risk_score),
    }
}
