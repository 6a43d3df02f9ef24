//! Deterministic scorers
//!
//! Pure functions over explicit configuration:
//!
//! - [`severity`]: per-complaint Environmental Severity Index and priority tier
//! - [`risk`]: per-water-body risk score and tier
//! - [`sla`]: priority → deadline offset

pub mod risk;
pub mod severity;
pub mod sla;

pub use risk::{score_risk, ComplaintHistory, RiskConfig, RiskScore, RiskWeights};
pub use severity::{
    normalize_density, score_severity, SeverityAssessment, SeverityBreakdown, SeverityConfig,
    SeverityInput, SeverityWeights, WaterBodyMultipliers,
};
pub use sla::{shift_days, SlaPolicy};

/// Complaints per day over a trailing window.
///
/// The denominator is the number of days since the oldest complaint inside the
/// window, floored at one day, so a burst of same-day reports counts as a burst.
pub fn complaints_per_day(count: u64, span_days: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    count as f64 / span_days.max(1.0)
}
