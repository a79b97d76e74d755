//! Status views over the scheduler, for hosts and diagnostics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Cadence;

/// Externally visible scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    /// No cycle armed; the scheduler is inert.
    Disabled,

    /// Waiting for the next timer fire or host wake.
    Armed,

    /// A cycle is in flight right now.
    Running,
}

/// Snapshot of the scheduler's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub phase: SchedulerPhase,
    pub cadence: Cadence,

    /// Start time of the most recent completed cycle.
    pub last_check: Option<DateTime<Utc>>,

    pub cycles_completed: u64,

    /// Triggers that arrived while a cycle was already in flight and were
    /// dropped by the re-entrancy guard.
    pub triggers_dropped: u64,
}
