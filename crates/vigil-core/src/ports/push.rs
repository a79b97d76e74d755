//! PushSender port: best-effort push-style notification delivery.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::PushError;

/// One push-style notification request.
///
/// `key` is stable per subject (derived from the subject id), so the
/// delivery layer can collapse a re-submission for the same subject instead
/// of showing a duplicate.
#[derive(Debug, Clone, Serialize)]
pub struct PushNote {
    pub key: String,
    pub title: String,
    pub body: String,
}

/// Fire-and-forget submission to the push delivery layer.
///
/// No retry contract: a failed submission is logged by the dispatcher and
/// that is the end of it. The next cycle's re-detection (which only happens
/// if the persisted flag write also failed) is the only retry path.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, note: PushNote) -> Result<(), PushError>;
}
