//! Broadcast event payloads.
//!
//! Two streams with different contracts: `CycleCompleted` fires after every
//! cycle so observers can refresh derived views, `DeceasedDetected` only
//! when a cycle actually found something.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::cycle::CycleResult;
use super::ids::CycleId;
use super::subject::Subject;

/// A poll cycle finished (successfully or not). Always broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct CycleCompleted {
    pub cycle_id: CycleId,
    pub started_at: DateTime<Utc>,
    pub newly_deceased: usize,
}

impl From<&CycleResult> for CycleCompleted {
    fn from(result: &CycleResult) -> Self {
        Self {
            cycle_id: result.cycle_id,
            started_at: result.started_at,
            newly_deceased: result.newly_deceased.len(),
        }
    }
}

/// A cycle found newly-deceased subjects. Broadcast only when non-empty.
#[derive(Debug, Clone, Serialize)]
pub struct DeceasedDetected {
    pub cycle_id: CycleId,
    pub subjects: Vec<Subject>,
}

impl From<&CycleResult> for DeceasedDetected {
    fn from(result: &CycleResult) -> Self {
        Self {
            cycle_id: result.cycle_id,
            subjects: result.newly_deceased.clone(),
        }
    }
}
