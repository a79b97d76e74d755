//! In-memory subject store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Subject, SubjectId};
use crate::error::StoreError;
use crate::ports::SubjectStore;

/// HashMap-backed [`SubjectStore`].
///
/// The real registry lives outside this core; this adapter backs the CLI
/// and the tests. One lock around the whole map keeps writes serialized,
/// which is all the write traffic here ever needs.
pub struct InMemorySubjectStore {
    subjects: Mutex<HashMap<SubjectId, Subject>>,
}

impl InMemorySubjectStore {
    pub fn new() -> Self {
        Self {
            subjects: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_subjects(subjects: impl IntoIterator<Item = Subject>) -> Self {
        Self {
            subjects: Mutex::new(
                subjects
                    .into_iter()
                    .map(|subject| (subject.id(), subject))
                    .collect(),
            ),
        }
    }

    pub async fn get(&self, id: SubjectId) -> Option<Subject> {
        self.subjects.lock().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.subjects.lock().await.len()
    }
}

impl Default for InMemorySubjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubjectStore for InMemorySubjectStore {
    async fn list_all(&self) -> Result<Vec<Subject>, StoreError> {
        let subjects = self.subjects.lock().await;
        let mut snapshot: Vec<Subject> = subjects.values().cloned().collect();
        // Stable output for callers that print the roster; cycle logic
        // must not depend on this.
        snapshot.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(snapshot)
    }

    async fn upsert(&self, subject: Subject) -> Result<(), StoreError> {
        self.subjects.lock().await.insert(subject.id(), subject);
        Ok(())
    }
}
