//! Cycle result: the output of one complete poll cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::CycleId;
use super::subject::Subject;

/// What one poll cycle found.
///
/// Ephemeral: consumed by the dispatcher right after the cycle and then
/// discarded. Only `started_at` outlives it, as the scheduler's last-check
/// timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle_id: CycleId,
    pub started_at: DateTime<Utc>,

    /// Subjects that transitioned from living to deceased during this
    /// cycle. Possibly empty; never contains a subject that was already
    /// flagged deceased in the snapshot.
    pub newly_deceased: Vec<Subject>,
}

impl CycleResult {
    pub fn empty(cycle_id: CycleId, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            started_at,
            newly_deceased: Vec::new(),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.newly_deceased.is_empty()
    }
}
