//! Change detection: which subjects newly transitioned to deceased.
//!
//! Pure functions over snapshot data. The persisted deceased flag is the
//! only dedupe ledger: a subject flagged deceased in the snapshot is never
//! probed again and never reclassified, so there is no separate "already
//! seen" bookkeeping to keep consistent with the registry.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::Subject;

/// Split a snapshot into (living, already-deceased).
///
/// Only the living half is ever probed against the reference source; this
/// is the sole idempotence guarantee against re-detecting the same
/// transition.
pub fn partition_living(snapshot: Vec<Subject>) -> (Vec<Subject>, Vec<Subject>) {
    snapshot.into_iter().partition(Subject::is_living)
}

/// Classify probe results and apply the transition.
///
/// A subject is newly deceased iff it was living in the snapshot and the
/// lookup produced a date. Subjects that were somehow already flagged (a
/// racing cycle that slipped past the re-entrancy guard) are dropped here
/// again, since `mark_deceased` refuses the second transition.
pub fn newly_deceased(
    probed: Vec<(Subject, Option<NaiveDate>)>,
    now: DateTime<Utc>,
) -> Vec<Subject> {
    probed
        .into_iter()
        .filter_map(|(mut subject, death_date)| {
            let date = death_date?;
            subject.mark_deceased(date, now).then_some(subject)
        })
        .collect()
}
