//! Hand-rolled fakes shared by the app-layer tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::Subject;
use crate::error::{PushError, StoreError};
use crate::impls::memory_store::InMemorySubjectStore;
use crate::ports::{PushNote, PushSender, ReferenceLookup, SubjectStore};

/// Records every push submission; optionally fails all of them.
pub struct RecordingPush {
    delivered: Mutex<Vec<PushNote>>,
    attempted: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingPush {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            attempted: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Successfully delivered notes.
    pub fn sent(&self) -> Vec<PushNote> {
        self.delivered.lock().unwrap().clone()
    }

    /// Total submissions, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(&self, note: PushNote) -> Result<(), PushError> {
        self.attempted.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushError::Transport("injected failure".to_string()));
        }
        self.delivered.lock().unwrap().push(note);
        Ok(())
    }
}

/// Lookup scripted per name: a date, nothing, or a hang that only resolves
/// through the executor's per-lookup timeout.
pub struct ScriptedLookup {
    dates: HashMap<String, NaiveDate>,
    hung: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self {
            dates: HashMap::new(),
            hung: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_date(mut self, name: &str, date: NaiveDate) -> Self {
        self.dates.insert(name.to_string(), date);
        self
    }

    pub fn with_hang(mut self, name: &str) -> Self {
        self.hung.insert(name.to_string());
        self
    }

    /// Names queried so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReferenceLookup for ScriptedLookup {
    async fn death_date(&self, name: &str) -> Option<NaiveDate> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.hung.contains(name) {
            return std::future::pending().await;
        }
        self.dates.get(name).copied()
    }
}

/// In-memory store with injectable read/write failures.
pub struct FlakyStore {
    inner: InMemorySubjectStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: InMemorySubjectStore) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubjectStore for FlakyStore {
    async fn list_all(&self) -> Result<Vec<Subject>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.list_all().await
    }

    async fn upsert(&self, subject: Subject) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected {
                subject: subject.id(),
                reason: "injected failure".to_string(),
            });
        }
        self.inner.upsert(subject).await
    }
}
