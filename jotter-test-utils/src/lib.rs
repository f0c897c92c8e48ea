//! Jotter Test Utilities
//!
//! Centralized test infrastructure for the Jotter workspace:
//! - In-memory and fault-injecting implementations of every port
//! - Proptest generators for note data
//! - Test fixtures for common scenarios
//! - Custom assertions for note results

// Re-export core types for convenience
pub use jotter_core::{
    CacheError, DependencyUnavailable, LivenessProbe, Note, NoteCache, NoteDraft, NoteError,
    NoteId, NoteResult, NoteStore, StorageError, Timestamp,
};

use async_trait::async_trait;
use chrono::Utc;
use jotter_core::{CacheResult, StorageResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// MOCK NOTE STORE
// ============================================================================

/// In-memory `NoteStore` that hands out sequential ids starting at 1.
///
/// Every call is counted, including failed ones, so tests can assert that a
/// rejected request never reached the store.
#[derive(Debug)]
pub struct MockNoteStore {
    notes: Mutex<BTreeMap<NoteId, Note>>,
    next_id: AtomicI64,
    create_calls: AtomicUsize,
    get_calls: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MockNoteStore {
    pub fn new() -> Self {
        Self {
            notes: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            create_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// A store whose every call fails with a backend error.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.set_fail_writes(true);
        store.set_fail_reads(true);
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    pub fn calls(&self) -> usize {
        self.create_calls() + self.get_calls()
    }

    pub fn len(&self) -> usize {
        self.notes.lock().map(|notes| notes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MockNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StorageError {
    StorageError::backend("lock", "mock store poisoned")
}

#[async_trait]
impl NoteStore for MockNoteStore {
    async fn create(&self, draft: &NoteDraft) -> StorageResult<Note> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("insert note", "connection refused"));
        }

        let raw = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = NoteId::new(raw).ok_or_else(|| StorageError::backend("insert note", "id overflow"))?;
        let note = draft.clone().into_note(id, Utc::now());

        self.notes
            .lock()
            .map_err(|_| poisoned())?
            .insert(id, note.clone());
        Ok(note)
    }

    async fn get_by_id(&self, id: NoteId) -> StorageResult<Note> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::backend("select note", "connection refused"));
        }

        self.notes
            .lock()
            .map_err(|_| poisoned())?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound { id })
    }
}

// ============================================================================
// MOCK NOTE CACHE
// ============================================================================

/// In-memory `NoteCache` with switchable failures. Entries never expire.
#[derive(Debug, Default)]
pub struct MockNoteCache {
    entries: Mutex<HashMap<String, String>>,
    set_calls: AtomicUsize,
    get_calls: AtomicUsize,
    fail_sets: AtomicBool,
    fail_gets: AtomicBool,
}

impl MockNoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose every call fails with a backend error.
    pub fn unavailable() -> Self {
        let cache = Self::new();
        cache.set_fail_sets(true);
        cache.set_fail_gets(true);
        cache
    }

    pub fn set_fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Read an entry directly, bypassing counters and failure switches.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Write an entry directly, bypassing counters and failure switches.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.into(), value.into());
        }
    }
}

fn cache_poisoned() -> CacheError {
    CacheError::backend("lock", "mock cache poisoned")
}

#[async_trait]
impl NoteCache for MockNoteCache {
    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(CacheError::backend("set", "connection refused"));
        }
        self.entries
            .lock()
            .map_err(|_| cache_poisoned())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(CacheError::backend("get", "connection refused"));
        }
        Ok(self
            .entries
            .lock()
            .map_err(|_| cache_poisoned())?
            .get(key)
            .cloned())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries
            .lock()
            .map_err(|_| cache_poisoned())?
            .remove(key);
        Ok(())
    }
}

/// `NoteCache` whose calls never complete, like a Redis that accepted the
/// connection and then went silent.
#[derive(Debug, Default)]
pub struct HangingNoteCache {
    calls: AtomicUsize,
}

impl HangingNoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn hang<T>(&self) -> T {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[async_trait]
impl NoteCache for HangingNoteCache {
    async fn set(&self, _key: &str, _value: &str) -> CacheResult<()> {
        self.hang().await
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        self.hang().await
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        self.hang().await
    }
}

// ============================================================================
// STATIC PROBE
// ============================================================================

/// `LivenessProbe` with a fixed answer.
#[derive(Debug)]
pub struct StaticProbe {
    name: String,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn up(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn down(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: Some(reason.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LivenessProbe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<(), DependencyUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            None => Ok(()),
            Some(reason) => Err(DependencyUnavailable::new(reason)),
        }
    }
}

/// `LivenessProbe` whose ping never completes.
#[derive(Debug)]
pub struct SilentLiveness {
    name: String,
}

impl SilentLiveness {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl LivenessProbe for SilentLiveness {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<(), DependencyUnavailable> {
        std::future::pending().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating note data.

    use super::*;
    use proptest::prelude::*;

    /// Non-empty title, up to 80 characters.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[\\PC]{1,80}"
    }

    /// Non-empty content, including multi-line text.
    pub fn arb_content() -> impl Strategy<Value = String> {
        "[\\PC\n]{1,500}".prop_filter("content must not be empty", |s| !s.is_empty())
    }

    pub fn arb_draft() -> impl Strategy<Value = NoteDraft> {
        (arb_title(), arb_content()).prop_filter_map("draft must validate", |(title, content)| {
            NoteDraft::new(title, content).ok()
        })
    }

    /// Any id a store could have generated.
    pub fn arb_note_id() -> impl Strategy<Value = NoteId> {
        (1..=i64::MAX).prop_filter_map("id must be positive", NoteId::new)
    }

    /// Raw wire ids that must be rejected.
    pub fn arb_non_positive_id() -> impl Strategy<Value = i64> {
        i64::MIN..=0
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::TimeZone;

    pub fn sample_draft() -> NoteDraft {
        NoteDraft::new("Shopping list", "milk, eggs, bread")
            .unwrap_or_else(|e| panic!("fixture draft must validate: {}", e))
    }

    /// A persisted note with a fixed timestamp.
    pub fn sample_note(id: i64) -> Note {
        let id = NoteId::new(id).unwrap_or_else(|| panic!("fixture id {} must be positive", id));
        let created_at = Utc
            .with_ymd_and_hms(2024, 1, 15, 9, 30, 0)
            .single()
            .unwrap_or_else(|| panic!("fixture timestamp must be valid"));
        sample_draft().into_note(id, created_at)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for note results.

    use super::*;

    /// Assert that a NoteResult is a NotFound storage error for `id`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &NoteResult<T>, id: NoteId) {
        match result {
            Err(NoteError::Storage(StorageError::NotFound { id: missing })) => {
                assert_eq!(*missing, id, "Wrong id in NotFound error");
            }
            other => panic!("Expected NotFound for {}, got: {:?}", id, other),
        }
    }

    /// Assert that a NoteResult is a storage backend error.
    #[track_caller]
    pub fn assert_storage_backend_error<T: std::fmt::Debug>(result: &NoteResult<T>) {
        match result {
            Err(NoteError::Storage(StorageError::Backend { .. })) => {}
            other => panic!("Expected storage backend error, got: {:?}", other),
        }
    }

    /// Assert the invariants every returned note must satisfy.
    #[track_caller]
    pub fn assert_fully_persisted(note: &Note) {
        assert!(note.id.get() > 0, "note id must be positive: {:?}", note);
        assert!(
            note.created_at.timestamp() > 0,
            "note must carry a creation time: {:?}",
            note
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_assigns_sequential_ids() {
        let store = MockNoteStore::new();
        let first = store.create(&fixtures::sample_draft()).await.unwrap();
        let second = store.create(&fixtures::sample_draft()).await.unwrap();

        assert_eq!(first.id.get(), 1);
        assert_eq!(second.id.get(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_store_counts_failed_calls() {
        let store = MockNoteStore::unavailable();
        assert!(store.create(&fixtures::sample_draft()).await.is_err());
        assert!(store.get_by_id(NoteId::new(1).unwrap()).await.is_err());
        assert_eq!(store.calls(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_mock_cache_distinguishes_absent_from_failure() {
        let cache = MockNoteCache::new();
        assert_eq!(cache.get("note:1").await.unwrap(), None);

        cache.set_fail_gets(true);
        assert!(cache.get("note:1").await.is_err());
    }

    #[tokio::test]
    async fn test_static_probe() {
        let probe = StaticProbe::down("Redis", "refused");
        let err = probe.ping().await.unwrap_err();
        assert_eq!(err.to_string(), "refused");
        assert_eq!(probe.calls(), 1);
    }
}
