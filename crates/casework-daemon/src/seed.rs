use anyhow::{Context, Result};
use casework::geo::PolygonBoundaries;
use casework::{SharedRepository, User, WaterBody};
use tracing::info;

use crate::config::DaemonConfig;

/// Upsert the configured users and water bodies and register the boundaries.
pub async fn apply(
    config: &DaemonConfig,
    repo: &SharedRepository,
    boundaries: &PolygonBoundaries,
) -> Result<()> {
    for seed in &config.users {
        let user = User {
            id: seed.resolved_id(),
            full_name: seed.full_name.clone(),
            email: seed.email.clone(),
            role: seed.role,
            active: seed.active,
        };
        repo.put_user(&user)
            .await
            .with_context(|| format!("Failed to seed user {}", seed.email))?;
    }

    for seed in &config.water_bodies {
        let id = seed.resolved_id();
        // Keep the last computed risk when re-seeding an existing body.
        let body = match repo.get_water_body(id).await? {
            Some(mut existing) => {
                existing.name = seed.name.clone();
                existing.kind = seed.kind;
                existing.sensitivity_score = seed.sensitivity_score;
                existing
            }
            None => {
                let mut body = WaterBody::new(seed.name.clone(), seed.kind, seed.sensitivity_score);
                body.id = id;
                body
            }
        };
        repo.put_water_body(&body)
            .await
            .with_context(|| format!("Failed to seed water body {}", seed.name))?;
        boundaries
            .register(id, seed.polygon())
            .with_context(|| format!("Invalid boundary for {}", seed.name))?;
    }

    info!(
        users = config.users.len(),
        water_bodies = config.water_bodies.len(),
        "Seed data applied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casework::external::BoundaryLookup;
    use casework::MemoryStore;
    use std::sync::Arc;

    /// Test: Seeding registers boundaries that the pipeline can look up
    #[tokio::test]
    async fn test_seed_registers_boundaries() {
        let config: DaemonConfig = toml::from_str(
            r#"
[[water_bodies]]
name = "Lake A"
kind = "lake"
sensitivity_score = 80
boundary = [[12.90, 77.50], [12.90, 77.52], [12.92, 77.52], [12.92, 77.50]]

[[users]]
full_name = "Sam Supervisor"
email = "sam@example.org"
role = "supervisor"
"#,
        )
        .unwrap();
        let repo: SharedRepository = Arc::new(MemoryStore::new());
        let boundaries = PolygonBoundaries::new();

        apply(&config, &repo, &boundaries).await.unwrap();
        apply(&config, &repo, &boundaries).await.unwrap();

        let id = config.water_bodies[0].resolved_id();
        assert_eq!(boundaries.containing_body(12.91, 77.51).await.unwrap(), Some(id));
        assert_eq!(boundaries.len(), 1);
        assert_eq!(repo.list_water_bodies().await.unwrap().len(), 1);
        let user = repo.get_user(config.users[0].resolved_id()).await.unwrap().unwrap();
        assert_eq!(user.full_name, "Sam Supervisor");
    }
}
