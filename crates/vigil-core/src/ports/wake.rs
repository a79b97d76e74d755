//! WakeRequester port: the host's deferred-execution scheduler.
//!
//! Hosts with an OS-level scheduling facility (launchd, systemd timers, a
//! mobile background-task API) can wake the process and re-enter the core
//! through `Scheduler::wake()`. This port only carries the *request* side;
//! the callback side is the host's concern.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::WakeError;

/// Best-effort "run me again no earlier than this" request.
///
/// The host may deny, delay, or silently drop the request. The scheduler
/// treats every outcome as advisory: its in-process fallback timer fires
/// regardless, so a denial costs nothing but the log line.
#[async_trait]
pub trait WakeRequester: Send + Sync {
    /// Ask for a single wake callback no earlier than `earliest_in` from
    /// now. A granted request fires once; the scheduler re-requests after
    /// each cycle.
    async fn request(&self, earliest_in: Duration) -> Result<(), WakeError>;

    /// Drop any pending wake request. Best-effort.
    async fn cancel(&self);
}

/// For hosts without a deferred-execution facility: always declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedWake;

#[async_trait]
impl WakeRequester for UnsupportedWake {
    async fn request(&self, _earliest_in: Duration) -> Result<(), WakeError> {
        Err(WakeError::Unsupported)
    }

    async fn cancel(&self) {}
}
