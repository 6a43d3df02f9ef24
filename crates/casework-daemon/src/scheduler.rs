use std::future::Future;
use std::time::Duration;

use casework::reporting::RiskRecalculator;
use casework::{CaseService, EscalationSweeper};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Counts of completed jobs, returned when the scheduler stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub sweeps: u64,
    pub risk_runs: u64,
}

/// Periodic jobs: escalation sweep plus re-assignment, and risk recomputation.
pub struct Scheduler {
    sweeper: EscalationSweeper,
    cases: CaseService,
    risk: RiskRecalculator,
    sweep_every: Duration,
    risk_every: Duration,
}

impl Scheduler {
    pub fn new(
        sweeper: EscalationSweeper,
        cases: CaseService,
        risk: RiskRecalculator,
        sweep_every: Duration,
        risk_every: Duration,
    ) -> Self {
        Self {
            sweeper,
            cases,
            risk,
            sweep_every,
            risk_every,
        }
    }

    /// Run until Ctrl-C.
    pub async fn run(&self) -> SchedulerStats {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` completes. Both jobs fire once immediately.
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        let mut stats = SchedulerStats::default();
        let mut sweep_tick = tokio::time::interval(self.sweep_every);
        sweep_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut risk_tick = tokio::time::interval(self.risk_every);
        risk_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            sweep_secs = self.sweep_every.as_secs(),
            risk_secs = self.risk_every.as_secs(),
            "Scheduler started"
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sweep_tick.tick() => {
                    self.sweep().await;
                    stats.sweeps += 1;
                }
                _ = risk_tick.tick() => {
                    self.recompute_risk().await;
                    stats.risk_runs += 1;
                }
            }
        }
        info!(sweeps = stats.sweeps, risk_runs = stats.risk_runs, "Scheduler stopped");
        stats
    }

    async fn sweep(&self) {
        match self.sweeper.run_once().await {
            Ok(summary) => {
                for action in &summary.actions {
                    info!(
                        case = %action.case_number,
                        tier = %action.tier,
                        reason = %action.reason,
                        "Escalation action"
                    );
                }
            }
            Err(e) => error!(error = %e, "Escalation sweep failed"),
        }
        match self.cases.assign_unassigned().await {
            Ok(sweep) if !sweep.assigned.is_empty() => {
                info!(assigned = sweep.assigned.len(), remaining = sweep.remaining, "Re-assignment pass");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Re-assignment pass failed"),
        }
    }

    async fn recompute_risk(&self) {
        if let Err(e) = self.risk.recalculate_all().await {
            error!(error = %e, "Risk recomputation failed");
        }
    }
}
