//! Poll executor: one complete check cycle over the roster.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::app::detect;
use crate::domain::{CycleId, CycleResult};
use crate::ports::{Clock, ReferenceLookup, SubjectStore};

const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one cycle: snapshot, probe living subjects, classify, write back.
///
/// Design intent:
/// - Per-subject lookups fan out concurrently; they are read-only and
///   independent, so one slow or failing subject never delays the verdict
///   for the others beyond the cycle's own fan-in.
/// - Detection and persistence are separate failure domains: a failed
///   write-back is logged but the detection is still reported, so the
///   dispatcher fires either way and the next cycle re-detects whatever
///   the registry did not record.
pub struct PollExecutor {
    store: Arc<dyn SubjectStore>,
    lookup: Arc<dyn ReferenceLookup>,
    clock: Arc<dyn Clock>,
    lookup_timeout: Duration,
}

impl PollExecutor {
    pub fn new(
        store: Arc<dyn SubjectStore>,
        lookup: Arc<dyn ReferenceLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            lookup,
            clock,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Bound each reference lookup so a hung call cannot stall the cycle
    /// (and with it re-arming) indefinitely.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Run one complete cycle. Never fails: every internal failure degrades
    /// to "no change for that subject this cycle".
    pub async fn run_cycle(&self) -> CycleResult {
        let started_at = self.clock.now();
        let cycle_id = CycleId::generate(started_at);

        let snapshot = match self.store.list_all().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(cycle = %cycle_id, %err, "snapshot read failed; skipping cycle");
                return CycleResult::empty(cycle_id, started_at);
            }
        };

        let (living, deceased) = detect::partition_living(snapshot);
        debug!(
            cycle = %cycle_id,
            living = living.len(),
            deceased = deceased.len(),
            "cycle started"
        );

        // Fan out one lookup per living subject. Deceased subjects are
        // never re-queried.
        let mut probes = JoinSet::new();
        for subject in living {
            let lookup = Arc::clone(&self.lookup);
            let timeout = self.lookup_timeout;
            probes.spawn(async move {
                let death_date =
                    match tokio::time::timeout(timeout, lookup.death_date(subject.name())).await {
                        Ok(date) => date,
                        Err(_) => {
                            warn!(name = subject.name(), "reference lookup timed out");
                            None
                        }
                    };
                (subject, death_date)
            });
        }

        let mut probed = Vec::new();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(probe) => probed.push(probe),
                // A panicked probe task costs that one subject its verdict
                // this cycle, nothing more.
                Err(err) => warn!(cycle = %cycle_id, %err, "lookup task failed"),
            }
        }

        let now = self.clock.now();
        let newly_deceased = detect::newly_deceased(probed, now);

        for subject in &newly_deceased {
            info!(
                cycle = %cycle_id,
                subject = %subject.id(),
                name = subject.name(),
                death_date = ?subject.death_date(),
                "newly deceased"
            );
            if let Err(err) = self.store.upsert(subject.clone()).await {
                warn!(
                    cycle = %cycle_id,
                    subject = %subject.id(),
                    %err,
                    "write-back failed; detection still reported"
                );
            }
        }

        CycleResult {
            cycle_id,
            started_at,
            newly_deceased,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::app::testutil::{FlakyStore, ScriptedLookup};
    use crate::domain::{Subject, SubjectId};
    use crate::impls::memory_store::InMemorySubjectStore;
    use crate::ports::FixedClock;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn roster() -> Vec<Subject> {
        vec![
            Subject::living(SubjectId::generate(now()), "Alice", now()),
            Subject::living(SubjectId::generate(now()), "Bob", now()),
            Subject::deceased(SubjectId::generate(now()), "Carol", date(2020, 1, 1), now()),
        ]
    }

    fn executor(store: Arc<dyn SubjectStore>, lookup: Arc<ScriptedLookup>) -> PollExecutor {
        PollExecutor::new(store, lookup, Arc::new(FixedClock(now())))
            .with_lookup_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn detects_only_living_subjects_with_a_date() {
        let store = Arc::new(InMemorySubjectStore::with_subjects(roster()));
        let lookup = Arc::new(ScriptedLookup::new().with_date("Bob", date(2024, 4, 30)));

        let result = executor(store.clone(), lookup.clone()).run_cycle().await;

        assert_eq!(result.newly_deceased.len(), 1);
        assert_eq!(result.newly_deceased[0].name(), "Bob");

        // Carol was already deceased and must never be queried.
        let calls = lookup.calls();
        assert!(calls.contains(&"Alice".to_string()));
        assert!(calls.contains(&"Bob".to_string()));
        assert!(!calls.contains(&"Carol".to_string()));

        // Bob's transition was persisted; Alice is untouched.
        let stored = store.get(result.newly_deceased[0].id()).await.unwrap();
        assert!(stored.is_deceased());
        assert_eq!(stored.death_date(), Some(date(2024, 4, 30)));
    }

    #[tokio::test]
    async fn a_second_identical_cycle_finds_nothing() {
        let store = Arc::new(InMemorySubjectStore::with_subjects(roster()));
        let lookup = Arc::new(ScriptedLookup::new().with_date("Bob", date(2024, 4, 30)));
        let executor = executor(store, lookup);

        let first = executor.run_cycle().await;
        assert_eq!(first.newly_deceased.len(), 1);

        // Bob's persisted flag is the dedupe marker: he is not probed again
        // and not re-detected.
        let second = executor.run_cycle().await;
        assert!(second.newly_deceased.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn one_hung_lookup_does_not_abort_the_others() {
        let store = Arc::new(InMemorySubjectStore::with_subjects(roster()));
        let lookup = Arc::new(
            ScriptedLookup::new()
                .with_hang("Alice")
                .with_date("Bob", date(2024, 4, 30)),
        );

        let result = executor(store, lookup).run_cycle().await;

        // Alice's lookup ran into the timeout; Bob is still detected and
        // the cycle completed.
        assert_eq!(result.newly_deceased.len(), 1);
        assert_eq!(result.newly_deceased[0].name(), "Bob");
    }

    #[tokio::test]
    async fn write_back_failure_still_reports_the_detection() {
        let store = Arc::new(FlakyStore::new(InMemorySubjectStore::with_subjects(roster())));
        store.fail_writes(true);
        let lookup = Arc::new(ScriptedLookup::new().with_date("Bob", date(2024, 4, 30)));

        let result = executor(store.clone(), lookup.clone()).run_cycle().await;

        // Detection and persistence are decoupled: the dispatcher still
        // hears about Bob even though the registry write failed.
        assert_eq!(result.newly_deceased.len(), 1);

        // And because nothing was persisted, the next cycle re-detects.
        store.fail_writes(false);
        let retry = executor(store, lookup).run_cycle().await;
        assert_eq!(retry.newly_deceased.len(), 1);
        assert_eq!(retry.newly_deceased[0].name(), "Bob");
    }

    #[tokio::test]
    async fn snapshot_read_failure_yields_an_empty_result() {
        let store = Arc::new(FlakyStore::new(InMemorySubjectStore::with_subjects(roster())));
        store.fail_reads(true);
        let lookup = Arc::new(ScriptedLookup::new());

        let result = executor(store, lookup.clone()).run_cycle().await;

        assert!(result.newly_deceased.is_empty());
        assert!(lookup.calls().is_empty());
    }

    #[tokio::test]
    async fn an_empty_roster_completes_quietly() {
        let store = Arc::new(InMemorySubjectStore::new());
        let lookup = Arc::new(ScriptedLookup::new());

        let result = executor(store, lookup).run_cycle().await;

        assert!(result.is_quiet());
        assert_eq!(result.started_at, now());
    }
}
