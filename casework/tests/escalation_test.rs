//! Escalation sweeper integration tests
//!
//! Tests verify:
//! - Level 1 fires inside the warning window without touching status
//! - Overdue complaints reach level 2 (status escalated) and, after the
//!   grace period, level 3
//! - Sweeps are idempotent and tiers only move forward
//! - Missing supervisors or admins do not block the record
//! - Concurrent sweeps never duplicate a tier transition

mod common;

use casework::types::EscalationRecord;
use casework::*;
use chrono::Duration;
use common::*;

fn tiers(history: &[EscalationRecord]) -> Vec<EscalationTier> {
    history.iter().map(|r| r.to_tier).collect()
}

/// Test: A deadline 25 hours out moves the tier to level 1 only
#[tokio::test]
async fn test_warning_window_sets_level_one() {
    let h = Harness::new().await;
    let officer = h.add_staff("Priya", Role::Officer).await;
    h.add_staff("Sam", Role::Supervisor).await;
    let now = fixed_now();
    let c = h
        .open_case(
            now + Duration::hours(25),
            ComplaintStatus::Assigned,
            None,
            Some(officer.id),
        )
        .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.actions.len(), 1);
    let action = &summary.actions[0];
    assert_eq!(action.case_number, c.case_number);
    assert_eq!(action.from_tier, None);
    assert_eq!(action.tier, EscalationTier::Level1);
    assert!(action.reason.starts_with("SLA deadline approaching"));
    assert_eq!(action.target, Some(officer.id));
    assert!(action.notified);

    let stored = h.repo.get_complaint(c.id).await.unwrap().unwrap();
    assert_eq!(stored.escalation_tier, Some(EscalationTier::Level1));
    assert_eq!(stored.status, ComplaintStatus::Assigned);
    assert_eq!(stored.escalated_at, Some(now));

    let history = h.repo.escalation_history(c.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_tier, None);
    assert_eq!(history[0].from_officer, Some(officer.id));
    assert_eq!(
        h.sink.subjects_for(officer.id),
        vec![format!("Escalation Alert: {}", c.case_number)]
    );
}

/// Test: Two days out is still outside the warning window
#[tokio::test]
async fn test_outside_warning_window_is_untouched() {
    let h = Harness::new().await;
    let now = fixed_now();
    let c = h
        .open_case(now + Duration::hours(48), ComplaintStatus::AiProcessed, None, None)
        .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();
    assert!(summary.actions.is_empty());
    assert!(h.repo.escalation_history(c.id).await.unwrap().is_empty());
}

/// Test: A passed deadline escalates to level 2, marks the status and routes to a supervisor
#[tokio::test]
async fn test_overdue_reaches_level_two() {
    let h = Harness::new().await;
    let officer = h.add_staff("Priya", Role::Officer).await;
    let supervisor = h.add_staff("Sam", Role::Supervisor).await;
    let now = fixed_now();
    let c = h
        .open_case(
            now - Duration::hours(2),
            ComplaintStatus::InProgress,
            Some(EscalationTier::Level1),
            Some(officer.id),
        )
        .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();

    assert_eq!(summary.actions.len(), 1);
    assert_eq!(summary.actions[0].tier, EscalationTier::Level2);
    assert_eq!(summary.actions[0].target, Some(supervisor.id));

    let stored = h.repo.get_complaint(c.id).await.unwrap().unwrap();
    assert_eq!(stored.escalation_tier, Some(EscalationTier::Level2));
    assert_eq!(stored.status, ComplaintStatus::Escalated);
    // The assignee is kept; the supervisor is only notified.
    assert_eq!(stored.assigned_to, Some(officer.id));

    let log = h.repo.status_log(c.id).await.unwrap();
    let last = log.last().unwrap();
    assert_eq!(last.from_status, Some(ComplaintStatus::InProgress));
    assert_eq!(last.to_status, ComplaintStatus::Escalated);
    assert_eq!(last.actor, None);

    let history = h.repo.escalation_history(c.id).await.unwrap();
    assert_eq!(history[0].from_tier, Some(EscalationTier::Level1));
    assert_eq!(history[0].to_officer, Some(supervisor.id));
    assert_eq!(h.sink.subjects_for(supervisor.id).len(), 1);
}

/// Test: Three days past the deadline at level 2 advances to level 3
#[tokio::test]
async fn test_grace_period_exceeded_reaches_level_three() {
    let h = Harness::new().await;
    let admin = h.add_staff("Ada", Role::Admin).await;
    let now = fixed_now();
    let c = h
        .open_case(
            now - Duration::days(3),
            ComplaintStatus::Escalated,
            Some(EscalationTier::Level2),
            None,
        )
        .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();

    assert_eq!(summary.actions.len(), 1);
    let action = &summary.actions[0];
    assert_eq!(action.from_tier, Some(EscalationTier::Level2));
    assert_eq!(action.tier, EscalationTier::Level3);
    assert_eq!(action.reason, "Critical SLA breach: 3 days overdue");
    assert_eq!(action.target, Some(admin.id));

    let stored = h.repo.get_complaint(c.id).await.unwrap().unwrap();
    assert_eq!(stored.escalation_tier, Some(EscalationTier::Level3));
    assert_eq!(stored.status, ComplaintStatus::Escalated);
}

/// Test: One day past the deadline at level 2 is still inside the grace period
#[tokio::test]
async fn test_level_two_waits_for_grace_period() {
    let h = Harness::new().await;
    h.add_staff("Ada", Role::Admin).await;
    let now = fixed_now();
    h.open_case(
        now - Duration::days(1),
        ComplaintStatus::Escalated,
        Some(EscalationTier::Level2),
        None,
    )
    .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();
    assert!(summary.actions.is_empty());
}

/// Test: A long-unswept complaint climbs every due tier in one pass
#[tokio::test]
async fn test_unswept_complaint_catches_up() {
    let h = Harness::new().await;
    h.add_staff("Sam", Role::Supervisor).await;
    h.add_staff("Ada", Role::Admin).await;
    let now = fixed_now();
    let c = h
        .open_case(now - Duration::days(5), ComplaintStatus::AiProcessed, None, None)
        .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();

    assert_eq!(summary.actions.len(), 2);
    let history = h.repo.escalation_history(c.id).await.unwrap();
    assert_eq!(
        tiers(&history),
        vec![EscalationTier::Level2, EscalationTier::Level3]
    );
    assert_eq!(history[0].from_tier, None);
    assert_eq!(history[1].from_tier, Some(EscalationTier::Level2));
}

/// Test: A second sweep at the same instant adds no records
#[tokio::test]
async fn test_sweep_is_idempotent() {
    let h = Harness::new().await;
    h.add_staff("Sam", Role::Supervisor).await;
    let now = fixed_now();
    for offset in [-30, -1, 20, 200] {
        h.open_case(
            now + Duration::hours(offset),
            ComplaintStatus::AiProcessed,
            None,
            None,
        )
        .await;
    }
    let sweeper = h.sweeper();

    let first = sweeper.run_once_at(now).await.unwrap();
    assert_eq!(first.actions.len(), 3);

    let second = sweeper.run_once_at(now).await.unwrap();
    assert!(second.actions.is_empty());
    assert!(second.failures.is_empty());
}

/// Test: Tier history over time is an ordered prefix of the ladder
#[tokio::test]
async fn test_tiers_only_move_forward() {
    let h = Harness::new().await;
    let officer = h.add_staff("Priya", Role::Officer).await;
    h.add_staff("Sam", Role::Supervisor).await;
    h.add_staff("Ada", Role::Admin).await;
    let start = fixed_now();
    let deadline = start + Duration::days(2);
    let c = h
        .open_case(deadline, ComplaintStatus::Assigned, None, Some(officer.id))
        .await;
    let sweeper = h.sweeper();

    for hours in (0..=24 * 6).step_by(6) {
        sweeper
            .run_once_at(start + Duration::hours(hours))
            .await
            .unwrap();
    }

    let history = h.repo.escalation_history(c.id).await.unwrap();
    assert_eq!(
        tiers(&history),
        vec![
            EscalationTier::Level1,
            EscalationTier::Level2,
            EscalationTier::Level3
        ]
    );
    for pair in history.windows(2) {
        assert_eq!(pair[1].from_tier, Some(pair[0].to_tier));
        assert!(pair[0].at <= pair[1].at);
    }
}

/// Test: Without a supervisor the level 2 record is still written, with no target
#[tokio::test]
async fn test_missing_supervisor_still_records() {
    let h = Harness::new().await;
    let now = fixed_now();
    let c = h
        .open_case(now - Duration::hours(1), ComplaintStatus::AiProcessed, None, None)
        .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();

    assert_eq!(summary.actions.len(), 1);
    assert_eq!(summary.actions[0].target, None);
    assert!(!summary.actions[0].notified);
    let history = h.repo.escalation_history(c.id).await.unwrap();
    assert_eq!(history[0].to_officer, None);
    let stored = h.repo.get_complaint(c.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ComplaintStatus::Escalated);
}

/// Test: Closed complaints are never escalated
#[tokio::test]
async fn test_closed_complaints_are_ignored() {
    let h = Harness::new().await;
    h.add_staff("Sam", Role::Supervisor).await;
    let now = fixed_now();
    let resolved = h
        .open_case(now - Duration::days(4), ComplaintStatus::Resolved, None, None)
        .await;
    let rejected = h
        .open_case(now - Duration::days(4), ComplaintStatus::Rejected, None, None)
        .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();

    assert_eq!(summary.evaluated, 0);
    assert!(summary.actions.is_empty());
    assert!(h.repo.escalation_history(resolved.id).await.unwrap().is_empty());
    assert!(h.repo.escalation_history(rejected.id).await.unwrap().is_empty());
}

/// Test: Concurrent sweeps write each tier transition exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sweeps_do_not_duplicate() {
    let h = Harness::new().await;
    h.add_staff("Sam", Role::Supervisor).await;
    h.add_staff("Ada", Role::Admin).await;
    let now = fixed_now();
    let mut ids = Vec::new();
    for i in 0..10 {
        let c = h
            .open_case(
                now - Duration::days(i % 4),
                ComplaintStatus::AiProcessed,
                None,
                None,
            )
            .await;
        ids.push(c.id);
    }
    let (a, b) = (h.sweeper(), h.sweeper());

    let (ra, rb) = tokio::join!(a.run_once_at(now), b.run_once_at(now));
    let total_actions = ra.unwrap().actions.len() + rb.unwrap().actions.len();

    let mut records = 0;
    for id in ids {
        let history = h.repo.escalation_history(id).await.unwrap();
        let mut seen = tiers(&history);
        seen.dedup();
        assert_eq!(seen.len(), history.len(), "duplicate tier in {:?}", history);
        for pair in history.windows(2) {
            assert!(pair[0].to_tier < pair[1].to_tier);
        }
        records += history.len();
    }
    assert_eq!(records, total_actions);
}

/// Test: A grace period beyond the calendar leaves level 2 in place without failing the sweep
#[tokio::test]
async fn test_oversized_grace_does_not_abort_sweep() {
    let mut h = Harness::new().await;
    h.add_staff("Sam", Role::Supervisor).await;
    h.add_staff("Ada", Role::Admin).await;
    let mut config = EngineConfig::default();
    config.escalation.admin_grace_days = 1_000_000_000;
    h.config = std::sync::Arc::new(config);
    let now = fixed_now();
    let stuck = h
        .open_case(
            now - Duration::days(4),
            ComplaintStatus::Escalated,
            Some(EscalationTier::Level2),
            None,
        )
        .await;
    let fresh = h
        .open_case(now - Duration::hours(1), ComplaintStatus::AiProcessed, None, None)
        .await;

    let summary = h.sweeper().run_once_at(now).await.unwrap();

    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.actions.len(), 1);
    assert_eq!(summary.actions[0].complaint_id, fresh.id);
    assert!(h.repo.escalation_history(stuck.id).await.unwrap().is_empty());
}
