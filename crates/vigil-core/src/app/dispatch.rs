//! Notification dispatch: route a cycle's findings to exactly one channel.
//!
//! Foreground host → the pending-alert slot, read and dismissed by the UI.
//! Background host → one best-effort push per subject. Never both.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::domain::{CycleCompleted, CycleResult, DeceasedDetected, CycleId, Subject};
use crate::ports::{PushNote, PushSender};

/// The one undelivered in-app alert payload.
///
/// Last-write-wins across cycles: a fresh batch replaces an undismissed
/// one. Only explicit dismissal clears the slot.
#[derive(Debug, Clone)]
pub struct PendingAlert {
    pub cycle_id: CycleId,
    pub subjects: Vec<Subject>,
}

/// Process-wide dispatch state. Single writer: every mutation goes through
/// the owning [`Dispatcher`] under one lock.
#[derive(Debug)]
struct DispatchState {
    app_active: bool,
    notifications_enabled: bool,
    pending_alert: Option<PendingAlert>,
}

enum Route {
    Alert,
    Push,
    Suppressed,
}

/// Routes newly-deceased batches and broadcasts cycle events.
pub struct Dispatcher {
    push: Arc<dyn PushSender>,
    state: Mutex<DispatchState>,
    cycle_tx: broadcast::Sender<CycleCompleted>,
    deceased_tx: broadcast::Sender<DeceasedDetected>,
}

impl Dispatcher {
    /// Starts foregrounded with notifications enabled; the host corrects
    /// both through the setters as its lifecycle signals arrive.
    pub fn new(push: Arc<dyn PushSender>) -> Self {
        let (cycle_tx, _) = broadcast::channel(32);
        let (deceased_tx, _) = broadcast::channel(32);
        Self {
            push,
            state: Mutex::new(DispatchState {
                app_active: true,
                notifications_enabled: true,
                pending_alert: None,
            }),
            cycle_tx,
            deceased_tx,
        }
    }

    /// Fired after every cycle, even a quiet one.
    pub fn subscribe_cycles(&self) -> broadcast::Receiver<CycleCompleted> {
        self.cycle_tx.subscribe()
    }

    /// Fired only for cycles that found newly-deceased subjects.
    pub fn subscribe_deceased(&self) -> broadcast::Receiver<DeceasedDetected> {
        self.deceased_tx.subscribe()
    }

    /// Host lifecycle signal. A plain flag write; takes effect on the next
    /// dispatch.
    pub async fn set_foreground(&self, active: bool) {
        self.state.lock().await.app_active = active;
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) {
        self.state.lock().await.notifications_enabled = enabled;
    }

    /// Read the pending alert without consuming it.
    pub async fn peek_pending_alert(&self) -> Option<PendingAlert> {
        self.state.lock().await.pending_alert.clone()
    }

    /// Explicit consumption by the foreground UI. The only way the slot is
    /// ever cleared.
    pub async fn dismiss_pending_alert(&self) {
        self.state.lock().await.pending_alert = None;
    }

    /// Route one cycle's findings, then broadcast the cycle events.
    pub async fn dispatch(&self, result: &CycleResult) {
        if !result.is_quiet() {
            // Decide the route and update the slot under the lock; the
            // actual push submissions happen after it is released.
            let route = {
                let mut state = self.state.lock().await;
                if state.app_active {
                    state.pending_alert = Some(PendingAlert {
                        cycle_id: result.cycle_id,
                        subjects: result.newly_deceased.clone(),
                    });
                    Route::Alert
                } else if state.notifications_enabled {
                    Route::Push
                } else {
                    Route::Suppressed
                }
            };

            match route {
                Route::Alert => {
                    info!(
                        cycle = %result.cycle_id,
                        subjects = result.newly_deceased.len(),
                        "pending alert armed for foreground consumer"
                    );
                }
                Route::Push => self.push_each(result).await,
                Route::Suppressed => {
                    debug!(
                        cycle = %result.cycle_id,
                        "notifications disabled; dropping batch"
                    );
                }
            }
        }

        // ignore send errors: subscribers may not exist yet or anymore
        let _ = self.cycle_tx.send(CycleCompleted::from(result));
        if !result.is_quiet() {
            let _ = self.deceased_tx.send(DeceasedDetected::from(result));
        }
    }

    /// One submission per subject. Failures are logged and do not block the
    /// remaining submissions.
    async fn push_each(&self, result: &CycleResult) {
        for subject in &result.newly_deceased {
            let note = PushNote {
                key: format!("deceased-{}", subject.id()),
                title: format!("{} has died", subject.name()),
                body: match subject.death_date() {
                    Some(date) => format!("{} died on {date}", subject.name()),
                    None => format!("{} has been reported deceased", subject.name()),
                },
            };
            if let Err(err) = self.push.send(note).await {
                warn!(
                    cycle = %result.cycle_id,
                    subject = %subject.id(),
                    %err,
                    "push submission failed"
                );
            }
        }
    }
}
