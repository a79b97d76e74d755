use thiserror::Error;

use crate::domain::SubjectId;

/// Failures from the subject registry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("subject store unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected for {subject}: {reason}")]
    WriteRejected { subject: SubjectId, reason: String },
}

/// Failures from the push delivery layer. Always recovered: a rejected
/// submission is logged and the remaining subjects are still submitted.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("push transport: {0}")]
    Transport(String),

    #[error("push gateway returned {status} for key {key}")]
    Rejected { key: String, status: u16 },
}

/// Failures from the host deferred-execution requester. Never fatal: the
/// in-process fallback timer keeps the scheduler live regardless.
#[derive(Debug, Error)]
pub enum WakeError {
    #[error("deferred wake not supported on this host")]
    Unsupported,

    #[error("deferred wake request denied: {0}")]
    Denied(String),
}
