//! SLA escalation ladder
//!
//! - [`engine`]: pure tier decision for one complaint
//! - [`sweeper`]: the periodic pass that applies decisions to every open complaint

pub mod engine;
pub mod sweeper;

pub use engine::{EscalationConfig, EscalationEngine, EscalationStep};
pub use sweeper::{EscalationAction, EscalationSweeper, SweepFailure, SweepSummary};
