//! SubjectStore port: the external subject registry.

use async_trait::async_trait;

use crate::domain::Subject;
use crate::error::StoreError;

/// Snapshot read and single-subject write-back against the registry.
///
/// Design intent:
/// - The registry is the source of truth for the roster; the core never
///   creates or deletes subjects.
/// - `upsert` is idempotent, keyed by the subject id, so re-persisting the
///   same transition on a retry cycle is harmless.
#[async_trait]
pub trait SubjectStore: Send + Sync {
    /// Current snapshot of all subjects. No mutation.
    async fn list_all(&self) -> Result<Vec<Subject>, StoreError>;

    /// Write one subject back (deceased flag, death date, last-updated).
    async fn upsert(&self, subject: Subject) -> Result<(), StoreError>;
}
