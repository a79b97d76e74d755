//! Subject record: a monitored entity and its living/deceased status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::SubjectId;

/// A monitored subject.
///
/// Design:
/// - The registry owns creation; this core only reads snapshots and writes
///   back the deceased transition.
/// - Fields are private so the one-way invariant holds: once `deceased` is
///   set it can never be cleared, and the death date never changes. The only
///   mutator is [`Subject::mark_deceased`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    id: SubjectId,
    name: String,
    deceased: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    death_date: Option<NaiveDate>,

    updated_at: DateTime<Utc>,
}

impl Subject {
    /// A living subject.
    pub fn living(id: SubjectId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            deceased: false,
            death_date: None,
            updated_at: now,
        }
    }

    /// A subject already recorded as deceased (e.g. seeded from the
    /// registry).
    pub fn deceased(
        id: SubjectId,
        name: impl Into<String>,
        death_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            deceased: true,
            death_date: Some(death_date),
            updated_at: now,
        }
    }

    pub fn id(&self) -> SubjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_living(&self) -> bool {
        !self.deceased
    }

    pub fn is_deceased(&self) -> bool {
        self.deceased
    }

    pub fn death_date(&self) -> Option<NaiveDate> {
        self.death_date
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Record the living-to-deceased transition.
    ///
    /// Returns false (and changes nothing) when the subject is already
    /// deceased: the persisted flag doubles as the dedupe marker, so a
    /// second marking must never move the death date or the timestamp.
    pub fn mark_deceased(&mut self, death_date: NaiveDate, now: DateTime<Utc>) -> bool {
        if self.deceased {
            return false;
        }
        self.deceased = true;
        self.death_date = Some(death_date);
        self.updated_at = now;
        true
    }
}
