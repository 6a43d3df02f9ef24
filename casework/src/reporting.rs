//! Zone risk recomputation and dashboard statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::scoring::{score_risk, shift_days, RiskConfig, RiskScore};
use crate::status::ComplaintStatus;
use crate::store::{ComplaintFilter, SharedRepository, StoreResult};
use crate::types::*;

/// One water body's freshly computed risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterBodyRisk {
    pub water_body_id: WaterBodyId,
    pub name: String,
    pub risk: RiskScore,
}

/// Recomputes and persists risk for every registered water body
pub struct RiskRecalculator {
    repo: SharedRepository,
    config: RiskConfig,
}

impl RiskRecalculator {
    pub fn new(repo: SharedRepository, config: RiskConfig) -> Self {
        Self { repo, config }
    }

    pub async fn recalculate_all(&self) -> StoreResult<Vec<WaterBodyRisk>> {
        self.recalculate_all_at(Utc::now()).await
    }

    /// Score every water body as of `now`, persist each result with a history
    /// row, and return them ranked by score descending (ties by name, then id).
    ///
    /// A water body that fails is logged and left out of the ranking.
    pub async fn recalculate_all_at(&self, now: DateTime<Utc>) -> StoreResult<Vec<WaterBodyRisk>> {
        let recent_since =
            shift_days(now, -self.config.recent_window_days).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut ranked = Vec::new();

        for body in self.repo.list_water_bodies().await? {
            match self.recalculate_one(&body, recent_since, now).await {
                Ok(risk) => ranked.push(WaterBodyRisk {
                    water_body_id: body.id,
                    name: body.name,
                    risk,
                }),
                Err(e) => warn!(water_body = %body.name, error = %e, "Risk recomputation failed"),
            }
        }

        ranked.sort_by(|a, b| {
            b.risk
                .risk_score
                .cmp(&a.risk.risk_score)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.water_body_id.cmp(&b.water_body_id))
        });
        info!(water_bodies = ranked.len(), "Risk recomputation complete");
        Ok(ranked)
    }

    async fn recalculate_one(
        &self,
        body: &WaterBody,
        recent_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<RiskScore> {
        let history = self.repo.complaint_history(body.id, recent_since).await?;
        let risk = score_risk(&history, &self.config);
        self.repo
            .record_risk(&RiskHistoryEntry {
                id: Uuid::new_v4(),
                water_body_id: body.id,
                risk_score: risk.risk_score,
                risk_level: risk.risk_level,
                complaint_density_score: risk.complaint_density_score,
                construction_score: risk.construction_score,
                urban_growth_score: risk.urban_growth_score,
                shrinkage_score: risk.shrinkage_score,
                calculated_at: now,
            })
            .await?;
        if risk.risk_level != body.risk_level {
            info!(
                water_body = %body.name,
                from = %body.risk_level,
                to = %risk.risk_level,
                score = risk.risk_score,
                "Water body risk level changed"
            );
        }
        Ok(risk)
    }
}

/// Dashboard headline figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_complaints: u64,
    pub active_complaints: u64,
    pub resolved_complaints: u64,
    pub critical_complaints: u64,
    pub overdue_complaints: u64,
    pub avg_resolution_hours: Option<f64>,
    /// Resolved share of all complaints, in percent to two decimals
    pub resolution_rate: f64,
    pub water_bodies_at_risk: u64,
}

pub async fn dashboard_stats(repo: &SharedRepository) -> StoreResult<DashboardStats> {
    dashboard_stats_at(repo, Utc::now()).await
}

pub async fn dashboard_stats_at(
    repo: &SharedRepository,
    now: DateTime<Utc>,
) -> StoreResult<DashboardStats> {
    let counts = repo.dashboard_counts(now).await?;
    let resolution_rate = if counts.total == 0 {
        0.0
    } else {
        round2(counts.resolved as f64 / counts.total as f64 * 100.0)
    };
    Ok(DashboardStats {
        total_complaints: counts.total,
        active_complaints: counts.active,
        resolved_complaints: counts.resolved,
        critical_complaints: counts.critical,
        overdue_complaints: counts.overdue,
        avg_resolution_hours: counts.avg_resolution_hours.map(round2),
        resolution_rate,
        water_bodies_at_risk: counts.water_bodies_at_risk,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Most recent critical complaints, open or closed, newest first.
pub async fn critical_alerts(repo: &SharedRepository, limit: usize) -> StoreResult<Vec<Complaint>> {
    let mut critical = repo
        .list_complaints(&ComplaintFilter {
            priority: Some(Priority::Critical),
            limit: usize::MAX,
            ..ComplaintFilter::default()
        })
        .await?;
    critical.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    critical.truncate(limit);
    Ok(critical)
}

/// One complaint on the public heatmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub complaint_id: ComplaintId,
    pub latitude: f64,
    pub longitude: f64,
    /// Severity scaled to 0–1
    pub weight: f64,
    pub priority: Priority,
}

/// Every complaint that was not rejected, weighted by severity.
pub async fn heatmap_points(repo: &SharedRepository) -> StoreResult<Vec<HeatmapPoint>> {
    let complaints = repo
        .list_complaints(&ComplaintFilter {
            limit: usize::MAX,
            ..ComplaintFilter::default()
        })
        .await?;
    Ok(complaints
        .into_iter()
        .filter(|c| c.status != ComplaintStatus::Rejected)
        .map(|c| HeatmapPoint {
            complaint_id: c.id,
            latitude: c.latitude,
            longitude: c.longitude,
            weight: f64::from(c.severity_score.clamp(0, 100)) / 100.0,
            priority: c.priority,
        })
        .collect())
}

/// Stored risk of one water body, as shown on the public dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskZone {
    pub water_body_id: WaterBodyId,
    pub name: String,
    pub risk_score: i32,
    pub risk_level: RiskLevel,
    pub risk_updated_at: Option<DateTime<Utc>>,
}

/// Everything the public transparency page shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicDashboard {
    pub stats: DashboardStats,
    pub heatmap_points: Vec<HeatmapPoint>,
    /// Ordered by name
    pub water_bodies: Vec<WaterBody>,
    pub critical_alerts: Vec<Complaint>,
    /// Highest risk first
    pub risk_zones: Vec<RiskZone>,
}

pub async fn public_dashboard(
    repo: &SharedRepository,
    alert_limit: usize,
) -> StoreResult<PublicDashboard> {
    public_dashboard_at(repo, alert_limit, Utc::now()).await
}

/// Assemble the public dashboard from stored state as of `now`.
///
/// Risk zones use the last recomputed scores; nothing is recomputed here.
pub async fn public_dashboard_at(
    repo: &SharedRepository,
    alert_limit: usize,
    now: DateTime<Utc>,
) -> StoreResult<PublicDashboard> {
    let stats = dashboard_stats_at(repo, now).await?;
    let heatmap_points = heatmap_points(repo).await?;
    let critical_alerts = critical_alerts(repo, alert_limit).await?;

    let mut water_bodies = repo.list_water_bodies().await?;
    water_bodies.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    let mut risk_zones: Vec<RiskZone> = water_bodies
        .iter()
        .map(|w| RiskZone {
            water_body_id: w.id,
            name: w.name.clone(),
            risk_score: w.risk_score,
            risk_level: w.risk_level,
            risk_updated_at: w.risk_updated_at,
        })
        .collect();
    // Stable sort keeps name order within equal scores.
    risk_zones.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

    Ok(PublicDashboard {
        stats,
        heatmap_points,
        water_bodies,
        critical_alerts,
        risk_zones,
    })
}
