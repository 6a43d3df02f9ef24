//! Engine configuration
//!
//! Every tunable of the scorers, the SLA policy, the escalation ladder, the
//! intake pipeline and notification delivery, in one serde-deserializable
//! struct. Missing sections and fields take their defaults.
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file
//! ([`EngineConfig::load`]), `CASEWORK_*` environment variables
//! ([`EngineConfig::apply_env`]).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::escalation::EscalationConfig;
use crate::notify::NotifyConfig;
use crate::pipeline::PipelineConfig;
use crate::scoring::{RiskConfig, SeverityConfig, SlaPolicy};

/// Tolerance when checking that a weight set sums to 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Upper bound for every day count (roughly a century)
pub const MAX_DAYS: i64 = 36_500;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub severity: SeverityConfig,
    pub risk: RiskConfig,
    pub sla: SlaPolicy,
    pub escalation: EscalationConfig,
    pub pipeline: PipelineConfig,
    pub notify: NotifyConfig,
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read a TOML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CASEWORK_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary lookup (tests pass a map here).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "CASEWORK_SLA_CRITICAL_DAYS", &mut self.sla.critical_days)?;
        override_parsed(&lookup, "CASEWORK_SLA_MEDIUM_DAYS", &mut self.sla.medium_days)?;
        override_parsed(&lookup, "CASEWORK_SLA_LOW_DAYS", &mut self.sla.low_days)?;
        override_parsed(
            &lookup,
            "CASEWORK_SEVERITY_CRITICAL_THRESHOLD",
            &mut self.severity.critical_threshold,
        )?;
        override_parsed(
            &lookup,
            "CASEWORK_SEVERITY_MEDIUM_THRESHOLD",
            &mut self.severity.medium_threshold,
        )?;
        override_parsed(
            &lookup,
            "CASEWORK_ESCALATION_WARNING_DAYS",
            &mut self.escalation.warning_days,
        )?;
        override_parsed(
            &lookup,
            "CASEWORK_ESCALATION_ADMIN_GRACE_DAYS",
            &mut self.escalation.admin_grace_days,
        )?;
        override_parsed(
            &lookup,
            "CASEWORK_NEARBY_RADIUS_M",
            &mut self.pipeline.nearby_radius_m,
        )?;
        override_parsed(
            &lookup,
            "CASEWORK_DENSITY_WINDOW_DAYS",
            &mut self.pipeline.density_window_days,
        )?;
        if let Some(prefix) = lookup("CASEWORK_CASE_PREFIX") {
            self.pipeline.case_prefix = prefix;
        }
        override_parsed(&lookup, "CASEWORK_NOTIFY_ATTEMPTS", &mut self.notify.attempts)?;
        Ok(())
    }

    /// Reject configurations the scorers cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_weight_sum("severity.weights", self.severity.weights.total())?;
        check_weight_sum("risk.weights", self.risk.weights.total())?;

        if self.severity.medium_threshold >= self.severity.critical_threshold {
            return Err(ConfigError::Invalid(format!(
                "severity.medium_threshold ({}) must be below critical_threshold ({})",
                self.severity.medium_threshold, self.severity.critical_threshold
            )));
        }
        if self.risk.medium_threshold >= self.risk.high_threshold {
            return Err(ConfigError::Invalid(format!(
                "risk.medium_threshold ({}) must be below high_threshold ({})",
                self.risk.medium_threshold, self.risk.high_threshold
            )));
        }
        let sla = &self.sla;
        check_days("sla.critical_days", sla.critical_days, 1)?;
        check_days("sla.medium_days", sla.medium_days, 1)?;
        check_days("sla.low_days", sla.low_days, 1)?;
        check_days("sla.default_days", sla.default_days, 1)?;
        check_days("escalation.warning_days", self.escalation.warning_days, 0)?;
        check_days(
            "escalation.admin_grace_days",
            self.escalation.admin_grace_days,
            0,
        )?;
        check_days(
            "pipeline.density_window_days",
            self.pipeline.density_window_days,
            1,
        )?;
        check_days("risk.recent_window_days", self.risk.recent_window_days, 1)?;
        let radius = self.pipeline.nearby_radius_m;
        if !radius.is_finite() || radius < 0.0 {
            return Err(ConfigError::Invalid(
                "pipeline.nearby_radius_m must be a non-negative number".into(),
            ));
        }
        if self.pipeline.case_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("pipeline.case_prefix is empty".into()));
        }
        Ok(())
    }
}

fn check_weight_sum(name: &str, total: f64) -> Result<(), ConfigError> {
    if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ConfigError::Invalid(format!(
            "{} sum to {:.4}, expected 1.0",
            name, total
        )));
    }
    Ok(())
}

fn check_days(name: &str, days: i64, min: i64) -> Result<(), ConfigError> {
    if !(min..=MAX_DAYS).contains(&days) {
        return Err(ConfigError::Invalid(format!(
            "{} ({}) must be between {} and {} days",
            name, days, min, MAX_DAYS
        )));
    }
    Ok(())
}

fn override_parsed<F, T>(lookup: &F, var: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(value) = lookup(var) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            })?;
    }
    Ok(())
}
