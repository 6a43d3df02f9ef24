use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use casework::geo::{GeoPoint, Polygon};
use casework::{EngineConfig, Role, WaterBodyKind};
use serde::Deserialize;
use uuid::Uuid;

/// Daemon configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// PostgreSQL URL; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub sweep_interval_secs: u64,
    pub risk_interval_secs: u64,
    /// Model server for violation classification; reports are degraded when unset.
    pub classifier_endpoint: Option<String>,
    pub classifier_timeout_secs: u64,
    pub engine: EngineConfig,
    pub water_bodies: Vec<WaterBodySeed>,
    pub users: Vec<UserSeed>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("CASEWORK_DATABASE_URL").ok(),
            sweep_interval_secs: 3600,
            risk_interval_secs: 86_400,
            classifier_endpoint: std::env::var("CASEWORK_CLASSIFIER_URL").ok(),
            classifier_timeout_secs: 30,
            engine: EngineConfig::default(),
            water_bodies: Vec::new(),
            users: Vec::new(),
        }
    }
}

/// A water body and its boundary ring of `[lat, lon]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct WaterBodySeed {
    pub id: Option<Uuid>,
    pub name: String,
    pub kind: WaterBodyKind,
    pub sensitivity_score: i32,
    pub boundary: Vec<[f64; 2]>,
}

impl WaterBodySeed {
    /// Explicit id, else one derived from the name so restarts agree.
    pub fn resolved_id(&self) -> Uuid {
        self.id
            .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_OID, self.name.as_bytes()))
    }

    pub fn polygon(&self) -> Polygon {
        Polygon::new(
            self.boundary
                .iter()
                .map(|[lat, lon]| GeoPoint::new(*lat, *lon))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    pub id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl UserSeed {
    /// Explicit id, else one derived from the email.
    pub fn resolved_id(&self) -> Uuid {
        self.id
            .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_OID, self.email.as_bytes()))
    }
}

impl DaemonConfig {
    /// Load from `path`, or defaults when no path is given. Engine settings
    /// then take `CASEWORK_*` overrides and are validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                toml::from_str::<Self>(&raw)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => Self::default(),
        };
        config.engine.apply_env()?;
        config.engine.validate()?;
        if config.sweep_interval_secs == 0 || config.risk_interval_secs == 0 {
            anyhow::bail!("sweep and risk intervals must be at least one second");
        }
        Ok(config)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn risk_interval(&self) -> Duration {
        Duration::from_secs(self.risk_interval_secs)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&UserSeed> {
        self.users.iter().find(|u| u.email.eq_ignore_ascii_case(email))
    }
}
