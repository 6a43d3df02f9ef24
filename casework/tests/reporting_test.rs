//! Zone risk recomputation integration tests

mod common;

use casework::types::RiskLevel;
use casework::*;
use common::*;

/// Test: Risk is computed per water body, persisted with history and ranked
#[tokio::test]
async fn test_risk_recomputation_ranks_and_persists() {
    let h = Harness::new().await;
    let quiet = WaterBody::new("Canal B", WaterBodyKind::Canal, 30);
    h.repo.put_water_body(&quiet).await.unwrap();
    let pipeline = h.pipeline(ScriptedClassifier::construction_high());
    let now = fixed_now();
    for _ in 0..5 {
        pipeline.submit_at(h.report_at(INSIDE_LAKE_A), now).await.unwrap();
    }

    let ranking = h.risk().recalculate_all_at(now).await.unwrap();

    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].water_body_id, h.lake.id);
    // density 25, construction 75, growth 50, shrinkage 100
    // 25×0.30 + 75×0.25 + 50×0.25 + 100×0.20 = 58.75
    let lake = &ranking[0].risk;
    assert_eq!(lake.complaint_density_score, 25);
    assert_eq!(lake.construction_score, 75);
    assert_eq!(lake.urban_growth_score, 50);
    assert_eq!(lake.shrinkage_score, 100);
    assert_eq!(lake.risk_score, 58);
    assert_eq!(lake.risk_level, RiskLevel::Medium);
    assert_eq!(ranking[1].name, "Canal B");
    assert_eq!(ranking[1].risk.risk_score, 0);

    let stored = h.repo.get_water_body(h.lake.id).await.unwrap().unwrap();
    assert_eq!(stored.risk_score, 58);
    assert_eq!(stored.risk_level, RiskLevel::Medium);
    assert_eq!(stored.risk_updated_at, Some(now));

    h.risk().recalculate_all_at(now).await.unwrap();
    let history = h.repo.risk_history(h.lake.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| e.risk_score == 58));

    let stats = reporting::dashboard_stats_at(&h.repo, now).await.unwrap();
    assert_eq!(stats.water_bodies_at_risk, 1);
}

/// Test: Complaints older than the recent window do not count as urban growth
#[tokio::test]
async fn test_old_complaints_are_not_recent() {
    let h = Harness::new().await;
    let pipeline = h.pipeline(ScriptedClassifier::construction_high());
    let then = fixed_now() - chrono::Duration::days(45);
    pipeline.submit_at(h.report_at(INSIDE_LAKE_A), then).await.unwrap();

    let ranking = h.risk().recalculate_all_at(fixed_now()).await.unwrap();
    let risk = &ranking[0].risk;
    assert_eq!(risk.complaint_density_score, 5);
    assert_eq!(risk.urban_growth_score, 0);
}

/// Test: Average resolution time is reported to two decimals
#[tokio::test]
async fn test_average_resolution_hours_are_rounded() {
    let h = Harness::new().await;
    let officer = h.add_staff("Priya", Role::Officer).await;
    let deadline = fixed_now() + chrono::Duration::days(3);
    let c = h
        .open_case(deadline, ComplaintStatus::InProgress, None, Some(officer.id))
        .await;
    let resolved_at = c.created_at + chrono::Duration::minutes(10 * 60 + 20);

    h.cases()
        .update_status_at(
            c.id,
            StatusUpdate {
                actor_id: officer.id,
                actor_role: officer.role,
                to: ComplaintStatus::Resolved,
                notes: Some("Cleared".into()),
                assign_to: None,
            },
            resolved_at,
        )
        .await
        .unwrap();

    let stats = reporting::dashboard_stats_at(&h.repo, resolved_at).await.unwrap();
    assert_eq!(stats.avg_resolution_hours, Some(10.33));
}

/// Test: The heatmap leaves out rejected complaints and weights by severity
#[tokio::test]
async fn test_heatmap_points() {
    let h = Harness::new().await;
    let now = fixed_now();
    let kept = h
        .open_case(now, ComplaintStatus::InProgress, None, None)
        .await;
    let resolved = h
        .open_case(now, ComplaintStatus::Resolved, None, None)
        .await;
    h.open_case(now, ComplaintStatus::Rejected, None, None).await;

    let mut points = reporting::heatmap_points(&h.repo).await.unwrap();
    points.sort_by_key(|p| p.complaint_id);

    let mut expected = vec![kept.id, resolved.id];
    expected.sort();
    assert_eq!(
        points.iter().map(|p| p.complaint_id).collect::<Vec<_>>(),
        expected
    );
    for point in &points {
        assert_eq!(point.weight, 0.76);
        assert_eq!(point.priority, Priority::Critical);
        assert_eq!((point.latitude, point.longitude), INSIDE_LAKE_A);
    }
}

/// Test: The public dashboard bundles stats, heatmap, bodies, alerts and stored risk
#[tokio::test]
async fn test_public_dashboard() {
    let h = Harness::new().await;
    let canal = WaterBody::new("Canal B", WaterBodyKind::Canal, 30);
    h.repo.put_water_body(&canal).await.unwrap();
    let pipeline = h.pipeline(ScriptedClassifier::construction_high());
    let now = fixed_now();
    for _ in 0..3 {
        pipeline.submit_at(h.report_at(INSIDE_LAKE_A), now).await.unwrap();
    }
    let ranking = h.risk().recalculate_all_at(now).await.unwrap();

    let public = reporting::public_dashboard_at(&h.repo, 2, now).await.unwrap();

    assert_eq!(public.stats.total_complaints, 3);
    assert_eq!(public.heatmap_points.len(), 3);
    assert_eq!(public.critical_alerts.len(), 2);
    let names: Vec<_> = public.water_bodies.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Canal B", "Lake A"]);
    assert_eq!(public.risk_zones.len(), 2);
    assert_eq!(public.risk_zones[0].water_body_id, h.lake.id);
    assert_eq!(public.risk_zones[0].risk_score, ranking[0].risk.risk_score);
    assert_eq!(public.risk_zones[0].risk_updated_at, Some(now));
    assert_eq!(public.risk_zones[1].name, "Canal B");
}
