//! Scheduler: cadence, arming, and the at-most-one-cycle guarantee.
//!
//! Two trigger sources funnel into one guarded path: the in-process
//! fallback timer (always armed alongside the cadence) and the host's
//! OS-level wake callback (best-effort, may never come). Whichever arrives
//! first runs the cycle; anything arriving while a cycle is in flight is
//! dropped, not queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::app::dispatch::Dispatcher;
use crate::app::executor::PollExecutor;
use crate::app::status::{SchedulerPhase, SchedulerStatus};
use crate::domain::{Cadence, CycleResult};
use crate::ports::WakeRequester;

/// Where a trigger came from, for logs and drop accounting.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    FallbackTimer,
    OsWake,
}

struct SchedState {
    cadence: Cadence,

    /// A future cycle is scheduled (timer task alive, wake requested).
    armed: bool,

    /// Re-entrancy guard: exactly one cycle may run at a time, whether it
    /// came from the timer, the OS wake, or a manual trigger.
    in_flight: bool,

    /// Shutdown side of the fallback timer task spawned by the current
    /// arming. Dropped and replaced on every re-arm.
    timer_shutdown: Option<watch::Sender<bool>>,

    last_check: Option<DateTime<Utc>>,
    cycles_completed: u64,
    triggers_dropped: u64,
}

struct SchedulerInner {
    executor: PollExecutor,
    dispatcher: Arc<Dispatcher>,
    wake: Arc<dyn WakeRequester>,
    state: Mutex<SchedState>,
}

impl SchedulerInner {
    /// Spawn the repeating fallback timer for `interval` and mark armed.
    /// Caller holds the state lock.
    fn arm_locked(inner: &Arc<SchedulerInner>, state: &mut SchedState, interval: Duration) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        state.timer_shutdown = Some(shutdown_tx);
        state.armed = true;
        info!(cadence = %state.cadence, "scheduler armed");

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(interval) => {
                        inner.trigger(Trigger::FallbackTimer).await;
                    }
                }
            }
            debug!("fallback timer stopped");
        });
    }

    /// Stop the fallback timer and disarm. Caller holds the state lock.
    fn disarm_locked(state: &mut SchedState) {
        if let Some(shutdown) = state.timer_shutdown.take() {
            // ignore send error: the timer task may already be gone
            let _ = shutdown.send(true);
        }
        state.armed = false;
    }

    /// Best-effort OS wake request. Denial costs a log line and nothing
    /// else: the fallback timer guarantees the next cycle regardless.
    async fn request_wake(&self, earliest_in: Duration) {
        if let Err(err) = self.wake.request(earliest_in).await {
            warn!(%err, "deferred wake request declined; relying on fallback timer");
        }
    }

    /// Guarded entry for timer fires and OS wakes.
    async fn trigger(&self, source: Trigger) -> Option<CycleResult> {
        {
            let mut state = self.state.lock().await;
            if !state.armed {
                debug!(?source, "trigger ignored; scheduler not armed");
                return None;
            }
            if state.in_flight {
                state.triggers_dropped += 1;
                debug!(?source, "cycle already in flight; trigger dropped");
                return None;
            }
            state.in_flight = true;
        }
        debug!(?source, "cycle triggered");
        Some(self.finish_cycle().await)
    }

    /// Run the cycle, dispatch, release the guard, re-request the wake.
    /// Callers must have set `in_flight` first.
    async fn finish_cycle(&self) -> CycleResult {
        let result = self.executor.run_cycle().await;
        self.dispatcher.dispatch(&result).await;

        let rearm = {
            let mut state = self.state.lock().await;
            state.in_flight = false;
            state.last_check = Some(result.started_at);
            state.cycles_completed += 1;
            // Re-arm whether the cycle found anything or failed: a granted
            // wake request is consumed per fire. Skipped when stop() or a
            // cadence change disarmed us mid-cycle.
            state.armed.then(|| state.cadence.interval()).flatten()
        };
        if let Some(interval) = rearm {
            self.request_wake(interval).await;
        }
        result
    }
}

/// Cloneable handle to the one scheduler instance of a process.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(
        executor: PollExecutor,
        dispatcher: Arc<Dispatcher>,
        wake: Arc<dyn WakeRequester>,
        cadence: Cadence,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                executor,
                dispatcher,
                wake,
                state: Mutex::new(SchedState {
                    cadence,
                    armed: false,
                    in_flight: false,
                    timer_shutdown: None,
                    last_check: None,
                    cycles_completed: 0,
                    triggers_dropped: 0,
                }),
            }),
        }
    }

    /// Arm the next cycle. No-op when the cadence is disabled or the
    /// scheduler is already armed.
    pub async fn start(&self) {
        let interval = {
            let mut state = self.inner.state.lock().await;
            if state.armed {
                debug!("scheduler already armed");
                return;
            }
            let Some(interval) = state.cadence.interval() else {
                info!("cadence disabled; scheduler stays inert");
                return;
            };
            SchedulerInner::arm_locked(&self.inner, &mut state, interval);
            interval
        };
        self.inner.request_wake(interval).await;
    }

    /// Cancel the next fire and any pending wake request. An in-flight
    /// cycle is left to finish; it will find the scheduler disarmed and
    /// not re-request anything.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock().await;
            if !state.armed {
                return;
            }
            SchedulerInner::disarm_locked(&mut state);
            info!("scheduler stopped");
        }
        self.inner.wake.cancel().await;
    }

    /// Swap the cadence: cancel whatever was armed and, unless the new
    /// cadence is disabled, re-arm under the new interval. Idempotent when
    /// the cadence is unchanged.
    pub async fn set_cadence(&self, cadence: Cadence) {
        let rearm = {
            let mut state = self.inner.state.lock().await;
            if state.cadence == cadence {
                return;
            }
            info!(from = %state.cadence, to = %cadence, "cadence updated");
            if state.armed {
                SchedulerInner::disarm_locked(&mut state);
            }
            state.cadence = cadence;
            match cadence.interval() {
                Some(interval) => {
                    SchedulerInner::arm_locked(&self.inner, &mut state, interval);
                    Some(interval)
                }
                None => None,
            }
        };
        self.inner.wake.cancel().await;
        if let Some(interval) = rearm {
            self.inner.request_wake(interval).await;
        }
    }

    /// Entry point for the host's OS-level wake callback.
    pub async fn wake(&self) -> Option<CycleResult> {
        self.inner.trigger(Trigger::OsWake).await
    }

    /// Manual trigger, outside the normal cadence. Permitted in every
    /// phase, subject to the same re-entrancy guard: `None` means a cycle
    /// was already in flight and this request was ignored.
    pub async fn run_now(&self) -> Option<CycleResult> {
        {
            let mut state = self.inner.state.lock().await;
            if state.in_flight {
                state.triggers_dropped += 1;
                debug!("cycle already in flight; manual trigger ignored");
                return None;
            }
            state.in_flight = true;
        }
        debug!("manual cycle triggered");
        Some(self.inner.finish_cycle().await)
    }

    /// Start time of the most recent completed cycle.
    pub async fn last_check(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().await.last_check
    }

    pub async fn cadence(&self) -> Cadence {
        self.inner.state.lock().await.cadence
    }

    pub async fn status(&self) -> SchedulerStatus {
        let state = self.inner.state.lock().await;
        SchedulerStatus {
            phase: if state.in_flight {
                SchedulerPhase::Running
            } else if state.armed {
                SchedulerPhase::Armed
            } else {
                SchedulerPhase::Disabled
            },
            cadence: state.cadence,
            last_check: state.last_check,
            cycles_completed: state.cycles_completed,
            triggers_dropped: state.triggers_dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::app::testutil::{RecordingPush, ScriptedLookup};
    use crate::domain::{Subject, SubjectId};
    use crate::impls::memory_store::InMemorySubjectStore;
    use crate::ports::{FixedClock, UnsupportedWake};

    const HOUR: Duration = Duration::from_secs(3_600);

    fn now() -> DateTime<Utc> {
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

    struct Fixture {
        scheduler: Scheduler,
        dispatcher: Arc<Dispatcher>,
        lookup: Arc<ScriptedLookup>,
        push: Arc<RecordingPush>,
    }

    fn fixture(cadence: Cadence, lookup: ScriptedLookup, subjects: Vec<Subject>) -> Fixture {
        let store = Arc::new(InMemorySubjectStore::with_subjects(subjects));
        let lookup = Arc::new(lookup);
        let push = Arc::new(RecordingPush::new());
        let dispatcher = Arc::new(Dispatcher::new(push.clone()));
        let executor =
            PollExecutor::new(store, lookup.clone(), Arc::new(FixedClock(now())))
                .with_lookup_timeout(Duration::from_secs(5));
        let scheduler = Scheduler::new(
            executor,
            dispatcher.clone(),
            Arc::new(UnsupportedWake),
            cadence,
        );
        Fixture {
            scheduler,
            dispatcher,
            lookup,
            push,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_timer_fires_a_cycle_per_interval() {
        let f = fixture(Cadence::Hourly, ScriptedLookup::new(), roster());
        f.scheduler.start().await;
        assert_eq!(f.scheduler.status().await.phase, SchedulerPhase::Armed);

        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        let status = f.scheduler.status().await;
        assert_eq!(status.cycles_completed, 1);
        assert_eq!(status.last_check, Some(now()));

        // Re-armed after a quiet cycle: the next interval fires again.
        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn start_with_disabled_cadence_stays_inert() {
        let f = fixture(Cadence::Disabled, ScriptedLookup::new(), roster());
        f.scheduler.start().await;

        assert_eq!(f.scheduler.status().await.phase, SchedulerPhase::Disabled);
        tokio::time::sleep(Duration::from_secs(86_400)).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn a_trigger_during_a_running_cycle_is_dropped() {
        // Alice's lookup hangs; the 5s executor timeout keeps the cycle
        // (and the in-flight guard) open while we poke at it.
        let f = fixture(
            Cadence::Hourly,
            ScriptedLookup::new().with_hang("Alice"),
            roster(),
        );
        f.scheduler.start().await;

        let manual = {
            let scheduler = f.scheduler.clone();
            tokio::spawn(async move { scheduler.run_now().await })
        };
        // Let the manual cycle take the guard and park on the hung lookup.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(f.scheduler.status().await.phase, SchedulerPhase::Running);

        // Simultaneous OS wake: dropped, not queued.
        assert!(f.scheduler.wake().await.is_none());

        let result = manual.await.unwrap();
        assert!(result.is_some());

        let status = f.scheduler.status().await;
        assert_eq!(status.cycles_completed, 1);
        assert_eq!(status.triggers_dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wake_runs_a_cycle_when_armed_and_idle() {
        let f = fixture(
            Cadence::Hourly,
            ScriptedLookup::new().with_date("Bob", date(2024, 4, 30)),
            roster(),
        );
        f.scheduler.start().await;

        let result = f.scheduler.wake().await.unwrap();
        assert_eq!(result.newly_deceased.len(), 1);
        assert_eq!(f.scheduler.status().await.cycles_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wake_is_ignored_while_disabled() {
        let f = fixture(Cadence::Hourly, ScriptedLookup::new(), roster());

        assert!(f.scheduler.wake().await.is_none());
        assert_eq!(f.scheduler.status().await.cycles_completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_now_works_even_while_disabled() {
        let f = fixture(Cadence::Disabled, ScriptedLookup::new(), roster());

        let result = f.scheduler.run_now().await;
        assert!(result.is_some());

        let status = f.scheduler.status().await;
        assert_eq!(status.phase, SchedulerPhase::Disabled);
        assert_eq!(status.cycles_completed, 1);
        assert!(status.last_check.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_then_start_restores_liveness() {
        let f = fixture(Cadence::Hourly, ScriptedLookup::new(), roster());
        f.scheduler.start().await;
        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 1);

        f.scheduler.stop().await;
        assert_eq!(f.scheduler.status().await.phase, SchedulerPhase::Disabled);
        tokio::time::sleep(3 * HOUR).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 1);

        f.scheduler.start().await;
        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn set_cadence_rearms_under_the_new_interval() {
        let f = fixture(Cadence::Hourly, ScriptedLookup::new(), roster());
        f.scheduler.start().await;

        f.scheduler.set_cadence(Cadence::Daily).await;
        assert_eq!(f.scheduler.cadence().await, Cadence::Daily);

        // The hourly timer is gone.
        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 0);

        // The daily one fires.
        tokio::time::sleep(Duration::from_secs(86_400)).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn set_cadence_to_disabled_disarms() {
        let f = fixture(Cadence::Hourly, ScriptedLookup::new(), roster());
        f.scheduler.start().await;

        f.scheduler.set_cadence(Cadence::Disabled).await;
        assert_eq!(f.scheduler.status().await.phase, SchedulerPhase::Disabled);

        tokio::time::sleep(3 * HOUR).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn set_cadence_arms_even_from_disabled() {
        let f = fixture(Cadence::Disabled, ScriptedLookup::new(), roster());

        f.scheduler.set_cadence(Cadence::Hourly).await;
        assert_eq!(f.scheduler.status().await.phase, SchedulerPhase::Armed);

        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn set_cadence_is_idempotent_when_unchanged() {
        let f = fixture(Cadence::Hourly, ScriptedLookup::new(), roster());
        f.scheduler.start().await;

        f.scheduler.set_cadence(Cadence::Hourly).await;
        assert_eq!(f.scheduler.status().await.phase, SchedulerPhase::Armed);

        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(f.scheduler.status().await.cycles_completed, 1);
    }

    #[tokio::test]
    async fn end_to_end_foreground_flow() {
        let f = fixture(
            Cadence::Hourly,
            ScriptedLookup::new().with_date("Bob", date(2024, 4, 30)),
            roster(),
        );
        f.dispatcher.set_foreground(true).await;

        // First cycle: Bob transitions, Carol is never queried.
        let result = f.scheduler.run_now().await.unwrap();
        assert_eq!(result.newly_deceased.len(), 1);
        assert_eq!(result.newly_deceased[0].name(), "Bob");
        assert!(!f.lookup.calls().contains(&"Carol".to_string()));

        // Foreground routing: alert slot, no pushes.
        let alert = f.dispatcher.peek_pending_alert().await.unwrap();
        assert_eq!(alert.subjects[0].name(), "Bob");
        assert!(f.push.sent().is_empty());
        f.dispatcher.dismiss_pending_alert().await;

        // Second identical cycle: nothing new, slot stays empty.
        let again = f.scheduler.run_now().await.unwrap();
        assert!(again.is_quiet());
        assert!(f.dispatcher.peek_pending_alert().await.is_none());
    }

    #[tokio::test]
    async fn end_to_end_background_flow() {
        let f = fixture(
            Cadence::Hourly,
            ScriptedLookup::new().with_date("Bob", date(2024, 4, 30)),
            roster(),
        );
        f.dispatcher.set_foreground(false).await;
        let mut deaths = f.dispatcher.subscribe_deceased();

        f.scheduler.run_now().await.unwrap();

        let sent = f.push.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].key.starts_with("deceased-"));
        assert!(f.dispatcher.peek_pending_alert().await.is_none());

        let event = deaths.try_recv().unwrap();
        assert_eq!(event.subjects[0].name(), "Bob");
    }
}
